//! Movement classification: rule table and record builder

mod builder;
mod movement;
mod rules;

pub use builder::{Classification, ClassificationTally, MovementRecordBuilder, PrecedencePolicy};
pub use movement::{MovementCode, MovementOutcome, MovementRecord, MovementType, TransactionType};
pub use rules::{Rule, RuleGroup, RulePredicate, RuleTable};
