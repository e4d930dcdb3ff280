//! Coverage record structures for inforce snapshots

use crate::error::{MovementError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which reporting period a snapshot (and every record in it) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPeriod {
    Current,
    Previous,
}

impl fmt::Display for SnapshotPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotPeriod::Current => f.write_str("current"),
            SnapshotPeriod::Previous => f.write_str("previous"),
        }
    }
}

/// Composite identifier of one coverage: contract id + coverage id
///
/// Ordering is lexicographic on (contract, coverage) and is the emission order
/// of classified output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoverageKey {
    pub contract_id: String,
    pub coverage_id: String,
}

impl CoverageKey {
    pub fn new(contract_id: impl Into<String>, coverage_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
            coverage_id: coverage_id.into(),
        }
    }
}

impl fmt::Display for CoverageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.contract_id, self.coverage_id)
    }
}

/// Administrative status code carried on a coverage record
///
/// Closed set of codes used by the movement rules. Anything else is kept as
/// `Unknown` so it is visible at the boundary instead of silently matching
/// a default branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatusCode {
    One,
    Two,
    Three,
    Four,
    Five,
    A,
    B,
    D,
    E,
    F,
    H,
    J,
    M,
    P,
    R,
    T,
    W,
    X,
    Unknown(String),
}

impl StatusCode {
    /// Every recognised code, in glossary order
    pub const KNOWN: [StatusCode; 18] = [
        StatusCode::One,
        StatusCode::Two,
        StatusCode::Three,
        StatusCode::Four,
        StatusCode::Five,
        StatusCode::A,
        StatusCode::B,
        StatusCode::D,
        StatusCode::E,
        StatusCode::F,
        StatusCode::H,
        StatusCode::J,
        StatusCode::M,
        StatusCode::P,
        StatusCode::R,
        StatusCode::T,
        StatusCode::W,
        StatusCode::X,
    ];

    /// Parse a raw extract code. Surrounding whitespace is ignored; the code
    /// itself must match exactly, so `d` is `Unknown("d")`, not `D`.
    /// Returns `None` for a blank code.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim();
        if code.is_empty() {
            return None;
        }
        let status = match code {
            "1" => StatusCode::One,
            "2" => StatusCode::Two,
            "3" => StatusCode::Three,
            "4" => StatusCode::Four,
            "5" => StatusCode::Five,
            "A" => StatusCode::A,
            "B" => StatusCode::B,
            "D" => StatusCode::D,
            "E" => StatusCode::E,
            "F" => StatusCode::F,
            "H" => StatusCode::H,
            "J" => StatusCode::J,
            "M" => StatusCode::M,
            "P" => StatusCode::P,
            "R" => StatusCode::R,
            "T" => StatusCode::T,
            "W" => StatusCode::W,
            "X" => StatusCode::X,
            _ => StatusCode::Unknown(code.to_string()),
        };
        Some(status)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatusCode::One => "1",
            StatusCode::Two => "2",
            StatusCode::Three => "3",
            StatusCode::Four => "4",
            StatusCode::Five => "5",
            StatusCode::A => "A",
            StatusCode::B => "B",
            StatusCode::D => "D",
            StatusCode::E => "E",
            StatusCode::F => "F",
            StatusCode::H => "H",
            StatusCode::J => "J",
            StatusCode::M => "M",
            StatusCode::P => "P",
            StatusCode::R => "R",
            StatusCode::T => "T",
            StatusCode::W => "W",
            StatusCode::X => "X",
            StatusCode::Unknown(code) => code,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, StatusCode::Unknown(_))
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for StatusCode {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        StatusCode::parse(&value).ok_or_else(|| "blank status code".to_string())
    }
}

impl From<StatusCode> for String {
    fn from(code: StatusCode) -> Self {
        code.as_str().to_string()
    }
}

/// One policy coverage as of a snapshot date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRecord {
    /// Unique within a snapshot
    pub coverage_key: CoverageKey,

    /// Administrative status at the snapshot date
    pub status_code: StatusCode,

    /// Primary (non-rider) coverage, used for decrement detection
    pub is_base_coverage: bool,

    /// Reporting period the record was extracted for
    pub snapshot_period: SnapshotPeriod,
}

impl CoverageRecord {
    pub fn new(
        contract_id: impl Into<String>,
        coverage_id: impl Into<String>,
        status_code: StatusCode,
        is_base_coverage: bool,
        snapshot_period: SnapshotPeriod,
    ) -> Self {
        Self {
            coverage_key: CoverageKey::new(contract_id, coverage_id),
            status_code,
            is_base_coverage,
            snapshot_period,
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.coverage_key.contract_id
    }
}

/// All coverage records of one reporting period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub period: SnapshotPeriod,
    pub valuation_date: NaiveDate,
    pub records: Vec<CoverageRecord>,
}

impl Snapshot {
    pub fn new(period: SnapshotPeriod, valuation_date: NaiveDate, records: Vec<CoverageRecord>) -> Self {
        Self {
            period,
            valuation_date,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check that every record carries this snapshot's period tag
    pub fn check_periods(&self) -> Result<()> {
        match self.records.iter().find(|r| r.snapshot_period != self.period) {
            Some(record) => Err(MovementError::PeriodMismatch {
                key: record.coverage_key.clone(),
                expected: self.period,
                found: record.snapshot_period,
            }),
            None => Ok(()),
        }
    }

    /// Records whose status code is outside the recognised set
    pub fn unknown_status_records(&self) -> impl Iterator<Item = &CoverageRecord> {
        self.records.iter().filter(|r| !r.status_code.is_known())
    }
}

/// Contract ids known to the contract registry as of the current period
///
/// Read-only for the duration of a run; only consulted by the new business rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractExistenceIndex {
    contracts: HashSet<String>,
}

impl ContractExistenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, contract_id: &str) -> bool {
        self.contracts.contains(contract_id)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ContractExistenceIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            contracts: iter.into_iter().map(Into::into).collect(),
        }
    }
}
