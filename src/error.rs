//! Error type for movement classification runs
//!
//! Every variant except the wrapped I/O errors is a structural or data-integrity
//! failure: the run is aborted and nothing is handed to the result sink.

use crate::classify::{MovementType, RuleGroup};
use crate::records::{CoverageKey, SnapshotPeriod};
use chrono::NaiveDate;
use thiserror::Error;

/// Render a key list for error messages, truncated after a handful of keys
fn key_list(keys: &[CoverageKey]) -> String {
    const SHOWN: usize = 10;
    let mut out = keys
        .iter()
        .take(SHOWN)
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if keys.len() > SHOWN {
        out.push_str(&format!(" (+{} more)", keys.len() - SHOWN));
    }
    out
}

#[derive(Error, Debug)]
pub enum MovementError {
    /// A snapshot holds more than one record for the same coverage key.
    #[error("{period} snapshot contains duplicate coverage keys: {}", key_list(.keys))]
    DuplicateKey {
        period: SnapshotPeriod,
        keys: Vec<CoverageKey>,
    },

    /// Added + Removed + Common does not cover the union of keys exactly once.
    #[error("{scope} partition counts do not reconcile: added {added} + removed {removed} + common {common} != {universe} distinct keys")]
    PartitionInvariant {
        scope: &'static str,
        added: usize,
        removed: usize,
        common: usize,
        universe: usize,
    },

    /// An emitted movement has some but not all movement fields populated.
    #[error("movement records with partially populated fields: {}", key_list(.keys))]
    FieldPopulation { keys: Vec<CoverageKey> },

    /// Full-coverage and base-coverage rules disagree and no precedence is configured.
    #[error("ambiguous classification for {key}: full-coverage rule gives {full:?}, base-coverage rule gives {base:?}")]
    AmbiguousClassification {
        key: CoverageKey,
        full: MovementType,
        base: MovementType,
    },

    /// More than one movement record was emitted for a key.
    #[error("coverage keys with more than one movement record: {}", key_list(.keys))]
    DuplicateMovement { keys: Vec<CoverageKey> },

    #[error("{new_business} new business movements exceed {added} added coverages")]
    NewBusinessExceedsAdded { new_business: usize, added: usize },

    /// Two status-dispatch rules in the same group claim the same code.
    #[error("rule group {group:?} maps status code '{code}' more than once")]
    OverlappingRules { group: RuleGroup, code: String },

    #[error("record {key} is tagged {found} but was supplied in the {expected} snapshot")]
    PeriodMismatch {
        key: CoverageKey,
        expected: SnapshotPeriod,
        found: SnapshotPeriod,
    },

    #[error("{found} snapshot supplied where the {expected} snapshot was expected")]
    SnapshotSlot {
        expected: SnapshotPeriod,
        found: SnapshotPeriod,
    },

    #[error("current valuation date {current} is not after previous valuation date {previous}")]
    PeriodOrder {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("blank status code on {key}")]
    InvalidStatusCode { key: CoverageKey },

    #[error("unrecognised status code '{code}' on {key}")]
    UnknownStatusCode { key: CoverageKey, code: String },

    #[error("invalid base coverage flag '{value}' on {key}")]
    InvalidBaseFlag { key: CoverageKey, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MovementError>;
