//! Coverage record model and snapshot loading

mod data;
pub mod loader;

pub use data::{ContractExistenceIndex, CoverageKey, CoverageRecord, Snapshot, SnapshotPeriod, StatusCode};
pub use loader::{load_contract_registry, load_snapshot, LoadOptions};
