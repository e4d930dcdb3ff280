//! Post-classification audit checks
//!
//! The audit reports, it never repairs. Every check runs, each violation is
//! logged, and the run fails with the first violation in check order:
//! partition completeness, field population, new business bound, key uniqueness.

use crate::classify::MovementRecord;
use crate::diff::KeyDiff;
use crate::error::{MovementError, Result};
use crate::records::{CoverageKey, Snapshot};
use log::{error, info};
use serde::Serialize;
use std::collections::HashSet;

/// Figures confirmed by a clean audit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    /// Distinct keys across both snapshots
    pub key_universe: usize,
    /// Distinct base-coverage keys across both snapshots
    pub base_key_universe: usize,
    pub new_business: usize,
}

/// Added + Removed + Common must cover every distinct key of the diff's scope exactly once
pub fn check_partitions(diff: &KeyDiff<'_>, previous: &Snapshot, current: &Snapshot) -> Result<usize> {
    let universe: HashSet<&CoverageKey> = previous
        .records
        .iter()
        .chain(current.records.iter())
        .filter(|r| diff.scope.includes(r))
        .map(|r| &r.coverage_key)
        .collect();

    let mut seen: HashSet<&CoverageKey> = HashSet::with_capacity(universe.len());
    seen.extend(diff.added.iter().map(|r| &r.coverage_key));
    seen.extend(diff.removed.iter().map(|r| &r.coverage_key));
    seen.extend(diff.common.iter().map(|(p, _)| &p.coverage_key));

    if diff.total() != universe.len() || seen != universe {
        return Err(MovementError::PartitionInvariant {
            scope: diff.scope.label(),
            added: diff.added.len(),
            removed: diff.removed.len(),
            common: diff.common.len(),
            universe: universe.len(),
        });
    }
    Ok(universe.len())
}

/// Every emitted record is either fully null or fully populated
pub fn check_field_population(movements: &[MovementRecord]) -> Result<()> {
    let keys: Vec<CoverageKey> = movements
        .iter()
        .filter(|m| !m.is_consistently_populated())
        .map(MovementRecord::coverage_key)
        .collect();
    if keys.is_empty() {
        Ok(())
    } else {
        Err(MovementError::FieldPopulation { keys })
    }
}

/// New business can only come from added coverages
pub fn check_new_business(movements: &[MovementRecord], added: usize) -> Result<usize> {
    let new_business = movements.iter().filter(|m| m.is_new_business()).count();
    if new_business > added {
        Err(MovementError::NewBusinessExceedsAdded { new_business, added })
    } else {
        Ok(new_business)
    }
}

/// No key produces two movement records
pub fn check_unique_movements(movements: &[MovementRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(movements.len());
    let mut duplicates: Vec<CoverageKey> = movements
        .iter()
        .map(MovementRecord::coverage_key)
        .filter(|key| !seen.insert(key.clone()))
        .collect();
    if duplicates.is_empty() {
        Ok(())
    } else {
        duplicates.sort();
        duplicates.dedup();
        Err(MovementError::DuplicateMovement { keys: duplicates })
    }
}

/// Run every check over a finished classification
pub fn audit_run(
    previous: &Snapshot,
    current: &Snapshot,
    full: &KeyDiff<'_>,
    base: &KeyDiff<'_>,
    movements: &[MovementRecord],
) -> Result<AuditSummary> {
    let mut summary = AuditSummary::default();
    let mut violations: Vec<MovementError> = Vec::new();

    match check_partitions(full, previous, current) {
        Ok(n) => summary.key_universe = n,
        Err(e) => violations.push(e),
    }
    match check_partitions(base, previous, current) {
        Ok(n) => summary.base_key_universe = n,
        Err(e) => violations.push(e),
    }
    if let Err(e) = check_field_population(movements) {
        violations.push(e);
    }
    match check_new_business(movements, full.added.len()) {
        Ok(n) => summary.new_business = n,
        Err(e) => violations.push(e),
    }
    if let Err(e) = check_unique_movements(movements) {
        violations.push(e);
    }

    for violation in &violations {
        error!("Audit violation: {}", violation);
    }

    match violations.into_iter().next() {
        Some(first) => Err(first),
        None => {
            info!(
                "Audit passed: {} keys ({} base), {} movements, {} new business",
                summary.key_universe,
                summary.base_key_universe,
                movements.len(),
                summary.new_business
            );
            Ok(summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{MovementOutcome, MovementType, TransactionType};
    use crate::diff::{DiffScope, KeyDiff};
    use crate::records::{CoverageRecord, SnapshotPeriod, StatusCode};
    use chrono::NaiveDate;

    fn record(contract: &str, period: SnapshotPeriod) -> CoverageRecord {
        CoverageRecord::new(contract, "01", StatusCode::D, true, period)
    }

    fn snapshot(period: SnapshotPeriod, contracts: &[&str]) -> Snapshot {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        Snapshot::new(period, date, contracts.iter().map(|c| record(c, period)).collect())
    }

    fn death(contract: &str) -> MovementRecord {
        let outcome = MovementOutcome::new(MovementType::Death, TransactionType::Death);
        MovementRecord::from_outcome(&record(contract, SnapshotPeriod::Previous), &outcome)
    }

    #[test]
    fn test_partitions_reconcile() {
        let previous = snapshot(SnapshotPeriod::Previous, &["C1", "C2"]);
        let current = snapshot(SnapshotPeriod::Current, &["C2", "C3"]);
        let diff = KeyDiff::compute(&previous, &current, DiffScope::AllCoverages).unwrap();
        assert_eq!(check_partitions(&diff, &previous, &current).unwrap(), 3);
    }

    #[test]
    fn test_tampered_partition_detected() {
        let previous = snapshot(SnapshotPeriod::Previous, &["C1", "C2"]);
        let current = snapshot(SnapshotPeriod::Current, &["C2", "C3"]);
        let mut diff = KeyDiff::compute(&previous, &current, DiffScope::AllCoverages).unwrap();
        // Same key reported as both removed and common
        let common = diff.common[0].0;
        diff.removed.push(common);

        match check_partitions(&diff, &previous, &current) {
            Err(MovementError::PartitionInvariant { removed, universe, .. }) => {
                assert_eq!(removed, 2);
                assert_eq!(universe, 3);
            }
            other => panic!("expected PartitionInvariant, got {:?}", other),
        }
    }

    #[test]
    fn test_field_population_names_keys() {
        let mut bad = death("C2");
        bad.transaction_code = None;
        let err = check_field_population(&[death("C1"), bad]).unwrap_err();
        match err {
            MovementError::FieldPopulation { keys } => assert_eq!(keys, vec![CoverageKey::new("C2", "01")]),
            other => panic!("expected FieldPopulation, got {:?}", other),
        }
    }

    #[test]
    fn test_new_business_bound() {
        let nb = MovementRecord::from_outcome(
            &record("C1", SnapshotPeriod::Current),
            &MovementOutcome::new_business(),
        );
        assert_eq!(check_new_business(&[nb.clone()], 1).unwrap(), 1);
        assert!(matches!(
            check_new_business(&[nb], 0),
            Err(MovementError::NewBusinessExceedsAdded { new_business: 1, added: 0 })
        ));
    }

    #[test]
    fn test_duplicate_movements_detected() {
        assert!(check_unique_movements(&[death("C1"), death("C2")]).is_ok());
        match check_unique_movements(&[death("C1"), death("C2"), death("C1")]) {
            Err(MovementError::DuplicateMovement { keys }) => assert_eq!(keys, vec![CoverageKey::new("C1", "01")]),
            other => panic!("expected DuplicateMovement, got {:?}", other),
        }
    }

    #[test]
    fn test_audit_returns_first_violation() {
        let previous = snapshot(SnapshotPeriod::Previous, &["C1"]);
        let current = snapshot(SnapshotPeriod::Current, &[]);
        let full = KeyDiff::compute(&previous, &current, DiffScope::AllCoverages).unwrap();
        let base = KeyDiff::compute(&previous, &current, DiffScope::BaseCoverages).unwrap();

        let summary = audit_run(&previous, &current, &full, &base, &[death("C1")]).unwrap();
        assert_eq!(summary.key_universe, 1);
        assert_eq!(summary.new_business, 0);

        let mut bad = death("C1");
        bad.movement_type_text = None;
        let err = audit_run(&previous, &current, &full, &base, &[bad.clone(), bad]).unwrap_err();
        assert!(matches!(err, MovementError::FieldPopulation { .. }));
    }
}
