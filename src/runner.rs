//! Movement runner: one full classification run over two snapshots
//!
//! Holds the rule table and run configuration so many runs (e.g. one per
//! reporting quarter) can reuse them. A run either returns every movement
//! together with an audited summary or fails as a whole; there is no partial
//! result to hand to a sink.
//!
//! # Example
//! ```ignore
//! let runner = MovementRunner::from_config(&RunConfig::default());
//! let run = runner.run(&previous, &current, &registry)?;
//! write_movements_to_path("movements.csv", &run.movements)?;
//! ```

use crate::classify::{ClassificationTally, MovementRecord, MovementRecordBuilder, PrecedencePolicy, RuleTable};
use crate::config::RunConfig;
use crate::diff::DiffEngine;
use crate::error::{MovementError, Result};
use crate::records::{ContractExistenceIndex, Snapshot, SnapshotPeriod};
use crate::validation::{audit_run, AuditSummary};
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts describing one completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub previous_valuation_date: NaiveDate,
    pub current_valuation_date: NaiveDate,
    pub previous_records: usize,
    pub current_records: usize,
    pub added: usize,
    pub removed: usize,
    pub common: usize,
    pub base_added: usize,
    pub base_removed: usize,
    pub precedence: PrecedencePolicy,
    pub classification: ClassificationTally,
    pub audit: AuditSummary,
    /// Movements per movement type label
    pub movement_counts: BTreeMap<String, usize>,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct ClassificationRun {
    /// One record per reportable movement, sorted by coverage key
    pub movements: Vec<MovementRecord>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub struct MovementRunner {
    engine: DiffEngine,
    builder: MovementRecordBuilder,
}

impl MovementRunner {
    /// Standard rules, default configuration
    pub fn new() -> Self {
        Self::from_config(&RunConfig::default())
    }

    /// Standard rules with the given configuration
    pub fn from_config(config: &RunConfig) -> Self {
        Self::with_rules(RuleTable::standard(), config)
    }

    /// Custom rule table
    pub fn with_rules(rules: RuleTable, config: &RunConfig) -> Self {
        Self {
            engine: DiffEngine::new(),
            builder: MovementRecordBuilder::new(rules, config.precedence).with_parallelism(config.parallel),
        }
    }

    pub fn run(
        &self,
        previous: &Snapshot,
        current: &Snapshot,
        registry: &ContractExistenceIndex,
    ) -> Result<ClassificationRun> {
        check_inputs(previous, current)?;

        info!(
            "Classifying movements {} -> {}: {} previous, {} current records, {} registered contracts",
            previous.valuation_date,
            current.valuation_date,
            previous.len(),
            current.len(),
            registry.len()
        );

        let diff = self.engine.diff(previous, current)?;
        let classification = self.builder.build(&diff, registry)?;
        let audit = audit_run(previous, current, &diff.full, &diff.base, &classification.movements)?;

        let mut movement_counts = BTreeMap::new();
        for movement in &classification.movements {
            if let Some(label) = &movement.movement_type_text {
                *movement_counts.entry(label.clone()).or_insert(0) += 1;
            }
        }

        let summary = RunSummary {
            previous_valuation_date: previous.valuation_date,
            current_valuation_date: current.valuation_date,
            previous_records: previous.len(),
            current_records: current.len(),
            added: diff.full.added.len(),
            removed: diff.full.removed.len(),
            common: diff.full.common.len(),
            base_added: diff.base.added.len(),
            base_removed: diff.base.removed.len(),
            precedence: self.builder.precedence(),
            classification: classification.tally,
            audit,
            movement_counts,
        };

        info!(
            "Run complete: {} movements ({} keys without movement)",
            classification.movements.len(),
            summary.classification.no_movement
        );

        Ok(ClassificationRun {
            movements: classification.movements,
            summary,
        })
    }
}

impl Default for MovementRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshots must be in the right slots, carry matching period tags, and be
/// in date order
fn check_inputs(previous: &Snapshot, current: &Snapshot) -> Result<()> {
    for (snapshot, expected) in [(previous, SnapshotPeriod::Previous), (current, SnapshotPeriod::Current)] {
        if snapshot.period != expected {
            return Err(MovementError::SnapshotSlot {
                expected,
                found: snapshot.period,
            });
        }
        snapshot.check_periods()?;
    }
    if current.valuation_date <= previous.valuation_date {
        return Err(MovementError::PeriodOrder {
            previous: previous.valuation_date,
            current: current.valuation_date,
        });
    }
    Ok(())
}
