//! Load inforce snapshots and the contract registry from CSV extracts

use super::{ContractExistenceIndex, CoverageKey, CoverageRecord, Snapshot, SnapshotPeriod, StatusCode};
use crate::error::{MovementError, Result};
use chrono::NaiveDate;
use csv::Reader;
use log::{debug, warn};
use std::path::Path;

/// Raw CSV row of a coverage extract
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "ContractID")]
    contract_id: String,
    #[serde(rename = "CoverageID")]
    coverage_id: String,
    #[serde(rename = "StatusCode")]
    status_code: String,
    #[serde(rename = "BaseCoverage")]
    base_coverage: String,
}

impl CsvRow {
    fn to_record(self, period: SnapshotPeriod, strict: bool) -> Result<CoverageRecord> {
        let key = CoverageKey::new(self.contract_id.trim(), self.coverage_id.trim());

        let is_base_coverage = match self.base_coverage.trim().to_ascii_uppercase().as_str() {
            "Y" | "YES" | "TRUE" | "1" => true,
            "N" | "NO" | "FALSE" | "0" => false,
            _ => {
                return Err(MovementError::InvalidBaseFlag {
                    key,
                    value: self.base_coverage,
                })
            }
        };

        let status_code = match StatusCode::parse(&self.status_code) {
            Some(StatusCode::Unknown(code)) if strict => {
                return Err(MovementError::UnknownStatusCode { key, code })
            }
            Some(code) => code,
            None => return Err(MovementError::InvalidStatusCode { key }),
        };

        Ok(CoverageRecord {
            coverage_key: key,
            status_code,
            is_base_coverage,
            snapshot_period: period,
        })
    }
}

/// Options for snapshot loading
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Reject status codes outside the recognised set instead of keeping them as `Unknown`
    pub strict_status_codes: bool,
}

/// Load one snapshot from a CSV file
pub fn load_snapshot<P: AsRef<Path>>(
    path: P,
    period: SnapshotPeriod,
    valuation_date: NaiveDate,
    options: LoadOptions,
) -> Result<Snapshot> {
    let path = path.as_ref();
    debug!("Loading {} snapshot from {}", period, path.display());
    let reader = Reader::from_path(path)?;
    read_snapshot(reader, period, valuation_date, options)
}

/// Load one snapshot from any reader (e.g., string buffer, network stream)
pub fn load_snapshot_from_reader<R: std::io::Read>(
    reader: R,
    period: SnapshotPeriod,
    valuation_date: NaiveDate,
    options: LoadOptions,
) -> Result<Snapshot> {
    read_snapshot(Reader::from_reader(reader), period, valuation_date, options)
}

fn read_snapshot<R: std::io::Read>(
    mut reader: Reader<R>,
    period: SnapshotPeriod,
    valuation_date: NaiveDate,
    options: LoadOptions,
) -> Result<Snapshot> {
    let mut records = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        records.push(row.to_record(period, options.strict_status_codes)?);
    }

    let snapshot = Snapshot::new(period, valuation_date, records);

    let unknown = snapshot.unknown_status_records().count();
    if unknown > 0 {
        warn!(
            "{} snapshot ({}) has {} records with unrecognised status codes",
            period, valuation_date, unknown
        );
    }
    debug!("Loaded {} {} records", snapshot.len(), period);

    Ok(snapshot)
}

/// Raw CSV row of a contract registry extract
#[derive(Debug, serde::Deserialize)]
struct RegistryRow {
    #[serde(rename = "ContractID")]
    contract_id: String,
}

/// Load the contract registry from a CSV file
pub fn load_contract_registry<P: AsRef<Path>>(path: P) -> Result<ContractExistenceIndex> {
    let reader = Reader::from_path(path)?;
    read_registry(reader)
}

/// Load the contract registry from any reader
pub fn load_contract_registry_from_reader<R: std::io::Read>(reader: R) -> Result<ContractExistenceIndex> {
    read_registry(Reader::from_reader(reader))
}

fn read_registry<R: std::io::Read>(mut reader: Reader<R>) -> Result<ContractExistenceIndex> {
    let mut ids = Vec::new();
    for result in reader.deserialize() {
        let row: RegistryRow = result?;
        ids.push(row.contract_id.trim().to_string());
    }
    let index: ContractExistenceIndex = ids.into_iter().collect();
    debug!("Loaded {} registered contracts", index.len());
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    fn sample_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/sample")
    }

    #[test]
    fn test_load_snapshot_from_reader() {
        let data = "ContractID,CoverageID,StatusCode,BaseCoverage\n\
                    C1,01,B,Y\n\
                    C1,02, D ,N\n\
                    C2,01,Z,true\n";
        let snapshot =
            load_snapshot_from_reader(data.as_bytes(), SnapshotPeriod::Previous, date(), LoadOptions::default())
                .expect("Failed to load snapshot");

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.records[0].coverage_key, CoverageKey::new("C1", "01"));
        assert!(snapshot.records[0].is_base_coverage);
        assert_eq!(snapshot.records[1].status_code, StatusCode::D);
        assert!(!snapshot.records[1].is_base_coverage);
        assert_eq!(snapshot.records[2].status_code, StatusCode::Unknown("Z".to_string()));
        assert!(snapshot.records.iter().all(|r| r.snapshot_period == SnapshotPeriod::Previous));
    }

    #[test]
    fn test_strict_mode_rejects_unknown_codes() {
        let data = "ContractID,CoverageID,StatusCode,BaseCoverage\nC2,01,Z,Y\n";
        let options = LoadOptions { strict_status_codes: true };
        let err = load_snapshot_from_reader(data.as_bytes(), SnapshotPeriod::Current, date(), options).unwrap_err();
        assert!(matches!(err, MovementError::UnknownStatusCode { ref code, .. } if code == "Z"));
    }

    #[test]
    fn test_lowercase_code_is_not_a_known_code() {
        let data = "ContractID,CoverageID,StatusCode,BaseCoverage\nC1,01,d,Y\n";

        let snapshot =
            load_snapshot_from_reader(data.as_bytes(), SnapshotPeriod::Previous, date(), LoadOptions::default())
                .expect("Failed to load snapshot");
        assert_eq!(snapshot.records[0].status_code, StatusCode::Unknown("d".to_string()));
        assert_eq!(snapshot.unknown_status_records().count(), 1);

        let options = LoadOptions { strict_status_codes: true };
        let err = load_snapshot_from_reader(data.as_bytes(), SnapshotPeriod::Previous, date(), options).unwrap_err();
        assert!(matches!(err, MovementError::UnknownStatusCode { ref code, .. } if code == "d"));
    }

    #[test]
    fn test_blank_status_and_bad_flag_rejected() {
        let blank = "ContractID,CoverageID,StatusCode,BaseCoverage\nC1,01,,Y\n";
        let err = load_snapshot_from_reader(blank.as_bytes(), SnapshotPeriod::Current, date(), LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, MovementError::InvalidStatusCode { .. }));

        let flag = "ContractID,CoverageID,StatusCode,BaseCoverage\nC1,01,B,maybe\n";
        let err = load_snapshot_from_reader(flag.as_bytes(), SnapshotPeriod::Current, date(), LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, MovementError::InvalidBaseFlag { ref value, .. } if value == "maybe"));
    }

    #[test]
    fn test_load_registry_from_reader() {
        let data = "ContractID\nC1\n C2 \n";
        let index = load_contract_registry_from_reader(data.as_bytes()).expect("Failed to load registry");
        assert_eq!(index.len(), 2);
        assert!(index.contains("C2"));
    }

    #[test]
    fn test_load_sample_files() {
        let dir = sample_dir();
        let previous = load_snapshot(dir.join("previous.csv"), SnapshotPeriod::Previous, date(), LoadOptions::default())
            .expect("Failed to load previous sample");
        let current = load_snapshot(dir.join("current.csv"), SnapshotPeriod::Current, date(), LoadOptions::default())
            .expect("Failed to load current sample");
        let registry = load_contract_registry(dir.join("contracts.csv")).expect("Failed to load registry sample");

        assert_eq!(previous.len(), 10);
        assert_eq!(current.len(), 8);
        assert_eq!(registry.len(), 10);
    }
}
