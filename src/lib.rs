//! Inforce movements - policy movement classification for IFRS17 reporting
//!
//! This library provides:
//! - Typed coverage snapshots and contract registry loading
//! - Full-coverage and base-coverage snapshot diffs
//! - A declarative movement rule table (new business, deaths, lapses, decrements, ...)
//! - Movement record building with an explicit precedence policy
//! - Post-run audit of partition and field-population invariants

pub mod records;
pub mod diff;
pub mod classify;
pub mod validation;
pub mod config;
pub mod runner;
pub mod sink;
pub mod error;

// Re-export commonly used types
pub use records::{ContractExistenceIndex, CoverageKey, CoverageRecord, Snapshot, SnapshotPeriod, StatusCode};
pub use diff::{DiffEngine, DiffPartition, SnapshotDiff};
pub use classify::{MovementCode, MovementRecord, MovementRecordBuilder, PrecedencePolicy, RuleTable};
pub use config::RunConfig;
pub use runner::{ClassificationRun, MovementRunner, RunSummary};
pub use error::MovementError;
