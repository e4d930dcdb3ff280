//! Declarative movement rule table
//!
//! Rules are grouped by the diff partition they apply to. Inside a group the
//! guard rules (contract registry checks) are tried first, in table order;
//! after that a record is dispatched on its status code through a lookup built
//! from the group's status lists. Status lists within one group must be
//! disjoint, which is checked when the table is built, so dispatch never needs
//! a tie-break.

use super::movement::{MovementOutcome, MovementType, TransactionType};
use crate::error::{MovementError, Result};
use crate::records::{ContractExistenceIndex, CoverageRecord, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which partition a rule group classifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleGroup {
    /// Coverages newly present in the current snapshot
    Added,
    /// Coverages present previously and absent now
    Removed,
    /// Base coverages present previously and absent now (decrement detection)
    BaseRemoved,
}

/// Condition a rule tests against a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePredicate {
    /// The record's contract is unknown to the contract registry
    ContractNotRegistered,
    /// The record's status code is one of the listed codes
    StatusIn(Vec<StatusCode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub predicate: RulePredicate,
    pub outcome: MovementOutcome,
}

impl Rule {
    pub fn new(predicate: RulePredicate, outcome: MovementOutcome) -> Self {
        Self { predicate, outcome }
    }

    /// Status dispatch rule over the given codes
    pub fn status(codes: &[StatusCode], outcome: MovementOutcome) -> Self {
        Self::new(RulePredicate::StatusIn(codes.to_vec()), outcome)
    }
}

/// Rules of one group with their status lookup
#[derive(Debug, Clone)]
struct RuleSet {
    /// Outcomes of registry guards, in table order
    unregistered_guards: Vec<MovementOutcome>,
    by_status: HashMap<StatusCode, MovementOutcome>,
}

impl RuleSet {
    fn build(group: RuleGroup, rules: Vec<Rule>) -> Result<Self> {
        let mut unregistered_guards = Vec::new();
        let mut by_status = HashMap::new();

        for rule in rules {
            match &rule.predicate {
                RulePredicate::ContractNotRegistered => unregistered_guards.push(rule.outcome),
                RulePredicate::StatusIn(codes) => {
                    for code in codes {
                        if by_status.insert(code.clone(), rule.outcome).is_some() {
                            return Err(MovementError::OverlappingRules {
                                group,
                                code: code.to_string(),
                            });
                        }
                    }
                }
            }
        }

        Ok(Self {
            unregistered_guards,
            by_status,
        })
    }

    fn classify(&self, record: &CoverageRecord, registry: &ContractExistenceIndex) -> Option<MovementOutcome> {
        if !registry.contains(record.contract_id()) {
            if let Some(outcome) = self.unregistered_guards.first() {
                return Some(*outcome);
            }
        }
        self.by_status.get(&record.status_code).copied()
    }
}

/// Movement rules for all three groups
#[derive(Debug, Clone)]
pub struct RuleTable {
    added: RuleSet,
    removed: RuleSet,
    base_removed: RuleSet,
}

impl RuleTable {
    /// Build a table, rejecting any status code mapped twice within a group
    pub fn new(added: Vec<Rule>, removed: Vec<Rule>, base_removed: Vec<Rule>) -> Result<Self> {
        Ok(Self {
            added: RuleSet::build(RuleGroup::Added, added)?,
            removed: RuleSet::build(RuleGroup::Removed, removed)?,
            base_removed: RuleSet::build(RuleGroup::BaseRemoved, base_removed)?,
        })
    }

    /// The IFRS17 movement reporting rules
    pub fn standard() -> Self {
        let (added, removed, base_removed) = standard_rules();
        match Self::new(added, removed, base_removed) {
            Ok(table) => table,
            Err(err) => unreachable!("standard rule table is invalid: {err}"),
        }
    }

    /// Apply one group's rules to a record; `None` means no movement
    pub fn classify(
        &self,
        group: RuleGroup,
        record: &CoverageRecord,
        registry: &ContractExistenceIndex,
    ) -> Option<MovementOutcome> {
        match group {
            RuleGroup::Added => self.added.classify(record, registry),
            RuleGroup::Removed => self.removed.classify(record, registry),
            RuleGroup::BaseRemoved => self.base_removed.classify(record, registry),
        }
    }
}

/// Rules for the added, removed and base-removed groups, in table order
fn standard_rules() -> (Vec<Rule>, Vec<Rule>, Vec<Rule>) {
    use StatusCode::*;

    let misc_on = TransactionType::MiscOn;
    let misc_off = TransactionType::MiscOff;

    let added = vec![
        Rule::new(RulePredicate::ContractNotRegistered, MovementOutcome::new_business()),
        Rule::status(&[B, E, A], MovementOutcome::new(MovementType::Reinstatement, misc_on)),
        Rule::status(
            &[One, Two, Three, Four, Five, D, F, H, J, M, R, T, W, X],
            MovementOutcome::new(MovementType::OtherOns, misc_on),
        ),
    ];

    let removed = vec![
        Rule::status(&[D], MovementOutcome::new(MovementType::Death, TransactionType::Death)),
        Rule::status(&[B], MovementOutcome::new(MovementType::Lapse, TransactionType::Lapse)),
        Rule::status(&[E], MovementOutcome::new(MovementType::Surrendered, TransactionType::Lapse)),
        Rule::status(&[A], MovementOutcome::new(MovementType::NotTaken, misc_off)),
        Rule::status(
            &[One, Two, Three, Four, M, P, R, T, W, X],
            MovementOutcome::new(MovementType::OtherOffs, misc_off),
        ),
    ];

    let base_removed = vec![Rule::status(
        &[J, Five],
        MovementOutcome::new(MovementType::Morbidity, TransactionType::OtherBenefitWithDecrement),
    )];

    (added, removed, base_removed)
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MovementCode;
    use crate::records::SnapshotPeriod;

    fn record(contract: &str, status: StatusCode, base: bool) -> CoverageRecord {
        CoverageRecord::new(contract, "01", status, base, SnapshotPeriod::Current)
    }

    fn registry() -> ContractExistenceIndex {
        ["C1"].into_iter().collect()
    }

    #[test]
    fn test_standard_rules_are_disjoint() {
        let (added, removed, base_removed) = standard_rules();
        assert_eq!(added.len(), 3);
        assert_eq!(removed.len(), 5);
        assert_eq!(base_removed.len(), 1);
        assert!(RuleTable::new(added, removed, base_removed).is_ok());
    }

    #[test]
    fn test_unregistered_contract_is_new_business() {
        let table = RuleTable::standard();
        // Guard wins over any status dispatch, including codes outside all lists
        for status in [StatusCode::Five, StatusCode::B, StatusCode::Unknown("Z".into())] {
            let outcome = table
                .classify(RuleGroup::Added, &record("C9", status, true), &registry())
                .expect("new business expected");
            assert_eq!(outcome.movement_type, MovementType::NewBusiness);
            assert_eq!(outcome.transaction_type.code(), 4);
            assert_eq!(outcome.new_coverage_flag, Some(true));
        }
    }

    #[test]
    fn test_added_status_dispatch() {
        let table = RuleTable::standard();
        let classify = |status| table.classify(RuleGroup::Added, &record("C1", status, true), &registry());

        for status in [StatusCode::B, StatusCode::E, StatusCode::A] {
            let outcome = classify(status).unwrap();
            assert_eq!(outcome.movement_type, MovementType::Reinstatement);
            assert_eq!(outcome.transaction_type.code(), 23);
            assert_eq!(outcome.new_coverage_flag, None);
        }
        for status in [StatusCode::One, StatusCode::Five, StatusCode::J, StatusCode::X] {
            let outcome = classify(status).unwrap();
            assert_eq!(outcome.movement_type, MovementType::OtherOns);
            assert_eq!(outcome.movement_type.movement_code(), MovementCode::On);
        }
        assert_eq!(classify(StatusCode::P), None);
        assert_eq!(classify(StatusCode::Unknown("Z".into())), None);
    }

    #[test]
    fn test_removed_status_dispatch() {
        let table = RuleTable::standard();
        let classify = |status| table.classify(RuleGroup::Removed, &record("C1", status, true), &registry());

        let expect = [
            (StatusCode::D, MovementType::Death, 1),
            (StatusCode::B, MovementType::Lapse, 2),
            (StatusCode::E, MovementType::Surrendered, 2),
            (StatusCode::A, MovementType::NotTaken, 22),
            (StatusCode::P, MovementType::OtherOffs, 22),
            (StatusCode::Four, MovementType::OtherOffs, 22),
        ];
        for (status, movement_type, code) in expect {
            let outcome = classify(status).unwrap();
            assert_eq!(outcome.movement_type, movement_type);
            assert_eq!(outcome.transaction_type.code(), code);
            assert_eq!(outcome.new_coverage_flag, None);
        }
        // Decrement codes are not full-coverage removals
        assert_eq!(classify(StatusCode::J), None);
        assert_eq!(classify(StatusCode::Five), None);
        assert_eq!(classify(StatusCode::H), None);
    }

    #[test]
    fn test_removed_ignores_registry() {
        let table = RuleTable::standard();
        let outcome = table.classify(RuleGroup::Removed, &record("C9", StatusCode::D, true), &registry());
        assert_eq!(outcome.map(|o| o.movement_type), Some(MovementType::Death));
    }

    #[test]
    fn test_base_removed_dispatch() {
        let table = RuleTable::standard();
        for status in [StatusCode::J, StatusCode::Five] {
            let outcome = table
                .classify(RuleGroup::BaseRemoved, &record("C1", status, true), &registry())
                .unwrap();
            assert_eq!(outcome.movement_type, MovementType::Morbidity);
            assert_eq!(outcome.transaction_type.code(), 3);
        }
        assert_eq!(
            table.classify(RuleGroup::BaseRemoved, &record("C1", StatusCode::D, true), &registry()),
            None
        );
    }

    #[test]
    fn test_overlapping_status_lists_rejected() {
        let lapse = MovementOutcome::new(MovementType::Lapse, TransactionType::Lapse);
        let death = MovementOutcome::new(MovementType::Death, TransactionType::Death);
        let result = RuleTable::new(
            vec![],
            vec![
                Rule::status(&[StatusCode::B, StatusCode::D], lapse),
                Rule::status(&[StatusCode::D], death),
            ],
            vec![],
        );
        match result {
            Err(MovementError::OverlappingRules { group, code }) => {
                assert_eq!(group, RuleGroup::Removed);
                assert_eq!(code, "D");
            }
            other => panic!("expected OverlappingRules, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_same_code_allowed_across_groups() {
        let lapse = MovementOutcome::new(MovementType::Lapse, TransactionType::Lapse);
        let morbidity = MovementOutcome::new(MovementType::Morbidity, TransactionType::OtherBenefitWithDecrement);
        let table = RuleTable::new(
            vec![],
            vec![Rule::status(&[StatusCode::J], lapse)],
            vec![Rule::status(&[StatusCode::J], morbidity)],
        );
        assert!(table.is_ok());
    }
}
