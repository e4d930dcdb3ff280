//! Snapshot diff: partitions the coverage key space into added, removed and common
//!
//! Each snapshot is indexed once by coverage key (hash map), so a diff is linear
//! in the size of the two snapshots. Partitions are sorted by key afterwards so
//! every downstream step sees the same order on every run.

use crate::error::{MovementError, Result};
use crate::records::{CoverageKey, CoverageRecord, Snapshot};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

/// Which partition of a diff a key falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiffPartition {
    /// In current, absent from previous
    Added,
    /// In previous, absent from current
    Removed,
    /// Present in both
    Common,
}

/// Key space a diff is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiffScope {
    /// Every coverage
    AllCoverages,
    /// Base coverages only, riders ignored
    BaseCoverages,
}

impl DiffScope {
    pub fn includes(&self, record: &CoverageRecord) -> bool {
        match self {
            DiffScope::AllCoverages => true,
            DiffScope::BaseCoverages => record.is_base_coverage,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiffScope::AllCoverages => "full coverage",
            DiffScope::BaseCoverages => "base coverage",
        }
    }
}

/// Hashed index of one snapshot's records by coverage key
pub type KeyIndex<'a> = HashMap<&'a CoverageKey, &'a CoverageRecord>;

/// Index a snapshot by coverage key, restricted to `scope`
///
/// Fails with every duplicated key in the snapshot, never keeps one copy.
pub fn index_snapshot<'a>(snapshot: &'a Snapshot, scope: DiffScope) -> Result<KeyIndex<'a>> {
    let mut index: KeyIndex<'a> = HashMap::with_capacity(snapshot.len());
    let mut duplicates: Vec<CoverageKey> = Vec::new();

    for record in snapshot.records.iter().filter(|r| scope.includes(r)) {
        if index.insert(&record.coverage_key, record).is_some() {
            duplicates.push(record.coverage_key.clone());
        }
    }

    if duplicates.is_empty() {
        Ok(index)
    } else {
        duplicates.sort();
        duplicates.dedup();
        Err(MovementError::DuplicateKey {
            period: snapshot.period,
            keys: duplicates,
        })
    }
}

/// The three partitions of one diff
///
/// Added records come from the current snapshot, removed records from the
/// previous one. Common pairs are (previous, current).
#[derive(Debug, Clone)]
pub struct KeyDiff<'a> {
    pub scope: DiffScope,
    pub added: Vec<&'a CoverageRecord>,
    pub removed: Vec<&'a CoverageRecord>,
    pub common: Vec<(&'a CoverageRecord, &'a CoverageRecord)>,
}

impl<'a> KeyDiff<'a> {
    /// Partition two snapshots over `scope`
    pub fn compute(previous: &'a Snapshot, current: &'a Snapshot, scope: DiffScope) -> Result<Self> {
        let prev_index = index_snapshot(previous, scope)?;
        let curr_index = index_snapshot(current, scope)?;

        let mut removed = Vec::new();
        let mut common = Vec::new();
        for (key, prev) in &prev_index {
            match curr_index.get(key) {
                Some(curr) => common.push((*prev, *curr)),
                None => removed.push(*prev),
            }
        }

        let mut added: Vec<&CoverageRecord> = curr_index
            .iter()
            .filter(|(key, _)| !prev_index.contains_key(*key))
            .map(|(_, record)| *record)
            .collect();

        added.sort_by(|a, b| a.coverage_key.cmp(&b.coverage_key));
        removed.sort_by(|a, b| a.coverage_key.cmp(&b.coverage_key));
        common.sort_by(|a, b| a.0.coverage_key.cmp(&b.0.coverage_key));

        debug!(
            "{} diff: {} added, {} removed, {} common",
            scope.label(),
            added.len(),
            removed.len(),
            common.len()
        );

        Ok(Self {
            scope,
            added,
            removed,
            common,
        })
    }

    /// Partition a key falls in, or `None` if neither snapshot holds it
    pub fn partition_of(&self, key: &CoverageKey) -> Option<DiffPartition> {
        let find = |records: &[&CoverageRecord]| {
            records
                .binary_search_by(|r| r.coverage_key.cmp(key))
                .is_ok()
        };
        if find(&self.added) {
            Some(DiffPartition::Added)
        } else if find(&self.removed) {
            Some(DiffPartition::Removed)
        } else if self
            .common
            .binary_search_by(|(prev, _)| prev.coverage_key.cmp(key))
            .is_ok()
        {
            Some(DiffPartition::Common)
        } else {
            None
        }
    }

    /// Total keys across all three partitions
    pub fn total(&self) -> usize {
        self.added.len() + self.removed.len() + self.common.len()
    }
}

/// Both diffs needed for one classification run
#[derive(Debug, Clone)]
pub struct SnapshotDiff<'a> {
    /// Over every coverage
    pub full: KeyDiff<'a>,
    /// Over base coverages only, used for decrement detection
    pub base: KeyDiff<'a>,
}

/// Computes full and base-coverage diffs between two snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn diff<'a>(&self, previous: &'a Snapshot, current: &'a Snapshot) -> Result<SnapshotDiff<'a>> {
        Ok(SnapshotDiff {
            full: KeyDiff::compute(previous, current, DiffScope::AllCoverages)?,
            base: KeyDiff::compute(previous, current, DiffScope::BaseCoverages)?,
        })
    }
}
