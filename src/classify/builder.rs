//! Movement record builder
//!
//! Applies the rule table to every key that is added, removed, or base-removed,
//! resolves the full-coverage / base-coverage overlap with an explicit policy,
//! and emits at most one movement record per key, ordered by key.

use super::movement::{MovementOutcome, MovementRecord};
use super::rules::{RuleGroup, RuleTable};
use crate::diff::SnapshotDiff;
use crate::error::{MovementError, Result};
use crate::records::{ContractExistenceIndex, CoverageKey, CoverageRecord};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do when the removed rules and the base-removed rules both produce
/// a movement for the same key and the two disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedencePolicy {
    /// Keep the full-coverage (removed) outcome
    #[default]
    PreferFullCoverage,
    /// Keep the base-coverage (decrement) outcome
    PreferBaseCoverage,
    /// Fail the run with `AmbiguousClassification`
    Error,
}

/// Per-run classification counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationTally {
    /// Distinct keys in Added ∪ Removed ∪ BaseRemoved
    pub evaluated: usize,
    /// Keys that produced a movement record
    pub emitted: usize,
    /// Keys classified with no reportable movement (dropped from output)
    pub no_movement: usize,
    /// Keys where the precedence policy picked between two outcomes
    pub precedence_resolved: usize,
}

/// Output of the builder for one run
#[derive(Debug, Clone)]
pub struct Classification {
    /// Sorted by coverage key
    pub movements: Vec<MovementRecord>,
    pub tally: ClassificationTally,
}

/// Records of one key in each classified partition
#[derive(Debug, Default, Clone, Copy)]
struct KeyCandidates<'a> {
    added: Option<&'a CoverageRecord>,
    removed: Option<&'a CoverageRecord>,
    base_removed: Option<&'a CoverageRecord>,
}

enum Resolution {
    Emitted { movement: MovementRecord, resolved: bool },
    NoMovement,
}

#[derive(Debug, Clone)]
pub struct MovementRecordBuilder {
    rules: RuleTable,
    precedence: PrecedencePolicy,
    parallel: bool,
}

impl MovementRecordBuilder {
    pub fn new(rules: RuleTable, precedence: PrecedencePolicy) -> Self {
        Self {
            rules,
            precedence,
            parallel: false,
        }
    }

    /// Dispatch keys across the rayon pool. Output order is unchanged.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn precedence(&self) -> PrecedencePolicy {
        self.precedence
    }

    pub fn build(&self, diff: &SnapshotDiff<'_>, registry: &ContractExistenceIndex) -> Result<Classification> {
        let mut by_key: BTreeMap<&CoverageKey, KeyCandidates<'_>> = BTreeMap::new();
        for record in &diff.full.added {
            by_key.entry(&record.coverage_key).or_default().added = Some(*record);
        }
        for record in &diff.full.removed {
            by_key.entry(&record.coverage_key).or_default().removed = Some(*record);
        }
        for record in &diff.base.removed {
            by_key.entry(&record.coverage_key).or_default().base_removed = Some(*record);
        }

        let candidates: Vec<(&CoverageKey, KeyCandidates<'_>)> = by_key.into_iter().collect();

        let resolutions: Vec<Resolution> = if self.parallel {
            candidates
                .par_iter()
                .map(|(key, c)| self.resolve(key, c, registry))
                .collect::<Result<Vec<_>>>()?
        } else {
            candidates
                .iter()
                .map(|(key, c)| self.resolve(key, c, registry))
                .collect::<Result<Vec<_>>>()?
        };

        let mut tally = ClassificationTally {
            evaluated: candidates.len(),
            ..Default::default()
        };
        let mut movements = Vec::with_capacity(resolutions.len());
        for resolution in resolutions {
            match resolution {
                Resolution::Emitted { movement, resolved } => {
                    tally.emitted += 1;
                    if resolved {
                        tally.precedence_resolved += 1;
                    }
                    movements.push(movement);
                }
                Resolution::NoMovement => tally.no_movement += 1,
            }
        }

        debug!(
            "Classified {} keys: {} movements, {} without movement, {} precedence resolutions",
            tally.evaluated, tally.emitted, tally.no_movement, tally.precedence_resolved
        );

        Ok(Classification { movements, tally })
    }

    fn resolve(
        &self,
        key: &CoverageKey,
        candidates: &KeyCandidates<'_>,
        registry: &ContractExistenceIndex,
    ) -> Result<Resolution> {
        // A key is never both added and removed, so only the removed and
        // base-removed outcomes can compete.
        if let Some((record, outcome)) = self.classify(RuleGroup::Added, candidates.added, registry) {
            return Ok(emit(record, &outcome, false));
        }

        let full = self.classify(RuleGroup::Removed, candidates.removed, registry);
        let base = self.classify(RuleGroup::BaseRemoved, candidates.base_removed, registry);

        let resolution = match (full, base) {
            (Some((record, f)), Some((_, b))) if f == b => emit(record, &f, false),
            (Some(full), Some(base)) => {
                let (record, outcome) = self.apply_precedence(key, full, base)?;
                emit(record, &outcome, true)
            }
            (Some((record, outcome)), None) | (None, Some((record, outcome))) => emit(record, &outcome, false),
            (None, None) => Resolution::NoMovement,
        };
        Ok(resolution)
    }

    fn classify<'r>(
        &self,
        group: RuleGroup,
        record: Option<&'r CoverageRecord>,
        registry: &ContractExistenceIndex,
    ) -> Option<(&'r CoverageRecord, MovementOutcome)> {
        let record = record?;
        self.rules
            .classify(group, record, registry)
            .map(|outcome| (record, outcome))
    }

    fn apply_precedence<'r>(
        &self,
        key: &CoverageKey,
        full: (&'r CoverageRecord, MovementOutcome),
        base: (&'r CoverageRecord, MovementOutcome),
    ) -> Result<(&'r CoverageRecord, MovementOutcome)> {
        match self.precedence {
            PrecedencePolicy::PreferFullCoverage => Ok(full),
            PrecedencePolicy::PreferBaseCoverage => Ok(base),
            PrecedencePolicy::Error => Err(MovementError::AmbiguousClassification {
                key: key.clone(),
                full: full.1.movement_type,
                base: base.1.movement_type,
            }),
        }
    }
}

impl Default for MovementRecordBuilder {
    fn default() -> Self {
        Self::new(RuleTable::standard(), PrecedencePolicy::default())
    }
}

fn emit(record: &CoverageRecord, outcome: &MovementOutcome, resolved: bool) -> Resolution {
    Resolution::Emitted {
        movement: MovementRecord::from_outcome(record, outcome),
        resolved,
    }
}
