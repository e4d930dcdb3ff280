//! Movement vocabulary and the classified output record

use crate::records::{CoverageKey, CoverageRecord, StatusCode};
use serde::{Deserialize, Serialize};

/// Direction of a movement relative to the inforce book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementCode {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
    #[serde(rename = "NONE")]
    None,
}

impl MovementCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementCode::On => "ON",
            MovementCode::Off => "OFF",
            MovementCode::None => "NONE",
        }
    }
}

/// Reportable movement categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MovementType {
    NewBusiness,
    Reinstatement,
    OtherOns,
    Death,
    Lapse,
    Surrendered,
    NotTaken,
    OtherOffs,
    Morbidity,
}

impl MovementType {
    pub fn label(&self) -> &'static str {
        match self {
            MovementType::NewBusiness => "New Business",
            MovementType::Reinstatement => "Reinstatement",
            MovementType::OtherOns => "Other Ons",
            MovementType::Death => "Death",
            MovementType::Lapse => "Lapse",
            MovementType::Surrendered => "Surrendered",
            MovementType::NotTaken => "Not Taken",
            MovementType::OtherOffs => "Other Offs",
            MovementType::Morbidity => "Morbidity (decrementing)",
        }
    }

    pub fn movement_code(&self) -> MovementCode {
        match self {
            MovementType::NewBusiness | MovementType::Reinstatement | MovementType::OtherOns => MovementCode::On,
            _ => MovementCode::Off,
        }
    }
}

/// Transaction categories used by downstream regulatory reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// 1
    Death,
    /// 2
    Lapse,
    /// 3
    OtherBenefitWithDecrement,
    /// 4
    NewIssue,
    /// 22
    MiscOff,
    /// 23
    MiscOn,
}

impl TransactionType {
    pub fn code(&self) -> u16 {
        match self {
            TransactionType::Death => 1,
            TransactionType::Lapse => 2,
            TransactionType::OtherBenefitWithDecrement => 3,
            TransactionType::NewIssue => 4,
            TransactionType::MiscOff => 22,
            TransactionType::MiscOn => 23,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Death => "Death (both lives for joint policies)",
            TransactionType::Lapse => "Lapse (including surrenders)",
            TransactionType::OtherBenefitWithDecrement => "Other Benefit (with decrement)",
            TransactionType::NewIssue => "New Issue",
            TransactionType::MiscOff => "Calendar Month End Misc. Off",
            TransactionType::MiscOn => "Calendar Month End Misc. On",
        }
    }
}

/// Movement attributes produced by a matched rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementOutcome {
    pub movement_type: MovementType,
    pub transaction_type: TransactionType,
    /// Only populated for new business
    pub new_coverage_flag: Option<bool>,
}

impl MovementOutcome {
    pub const fn new(movement_type: MovementType, transaction_type: TransactionType) -> Self {
        Self {
            movement_type,
            transaction_type,
            new_coverage_flag: None,
        }
    }

    pub const fn new_business() -> Self {
        Self {
            movement_type: MovementType::NewBusiness,
            transaction_type: TransactionType::NewIssue,
            new_coverage_flag: Some(true),
        }
    }
}

/// Classified output for one coverage
///
/// Carries the originating key, contract and status so the sink can join the
/// movement back to policy attributes. Movement fields are either all null
/// (`movement_code = NONE`) or fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    #[serde(rename = "ContractID")]
    pub contract_id: String,
    #[serde(rename = "CoverageID")]
    pub coverage_id: String,
    #[serde(rename = "StatusCode")]
    pub status_code: StatusCode,
    #[serde(rename = "MovementCode")]
    pub movement_code: MovementCode,
    #[serde(rename = "MovementType")]
    pub movement_type_text: Option<String>,
    #[serde(rename = "TransactionType")]
    pub transaction_type_text: Option<String>,
    #[serde(rename = "TransactionCode")]
    pub transaction_code: Option<u16>,
    #[serde(rename = "NewCoverageFlag")]
    pub new_coverage_flag: Option<bool>,
}

impl MovementRecord {
    /// Output row for a record matched by a rule
    pub fn from_outcome(record: &CoverageRecord, outcome: &MovementOutcome) -> Self {
        Self {
            contract_id: record.coverage_key.contract_id.clone(),
            coverage_id: record.coverage_key.coverage_id.clone(),
            status_code: record.status_code.clone(),
            movement_code: outcome.movement_type.movement_code(),
            movement_type_text: Some(outcome.movement_type.label().to_string()),
            transaction_type_text: Some(outcome.transaction_type.label().to_string()),
            transaction_code: Some(outcome.transaction_type.code()),
            new_coverage_flag: outcome.new_coverage_flag,
        }
    }

    /// Output row with every movement field null
    pub fn no_movement(record: &CoverageRecord) -> Self {
        Self {
            contract_id: record.coverage_key.contract_id.clone(),
            coverage_id: record.coverage_key.coverage_id.clone(),
            status_code: record.status_code.clone(),
            movement_code: MovementCode::None,
            movement_type_text: None,
            transaction_type_text: None,
            transaction_code: None,
            new_coverage_flag: None,
        }
    }

    pub fn coverage_key(&self) -> CoverageKey {
        CoverageKey::new(self.contract_id.as_str(), self.coverage_id.as_str())
    }

    pub fn is_new_business(&self) -> bool {
        self.transaction_code == Some(TransactionType::NewIssue.code())
    }

    /// All-or-nothing field population check
    ///
    /// Either every movement field is null and the code is `NONE`, or the code is
    /// ON/OFF with both texts and the transaction code present. The new coverage
    /// flag is only ever set on new business.
    pub fn is_consistently_populated(&self) -> bool {
        match self.movement_code {
            MovementCode::None => {
                self.movement_type_text.is_none()
                    && self.transaction_type_text.is_none()
                    && self.transaction_code.is_none()
                    && self.new_coverage_flag.is_none()
            }
            MovementCode::On | MovementCode::Off => {
                self.movement_type_text.is_some()
                    && self.transaction_type_text.is_some()
                    && self.transaction_code.is_some()
                    && (self.new_coverage_flag.is_some() == self.is_new_business())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SnapshotPeriod;

    fn record() -> CoverageRecord {
        CoverageRecord::new("C1", "01", StatusCode::D, true, SnapshotPeriod::Previous)
    }

    #[test]
    fn test_movement_codes() {
        assert_eq!(MovementType::NewBusiness.movement_code(), MovementCode::On);
        assert_eq!(MovementType::OtherOns.movement_code(), MovementCode::On);
        assert_eq!(MovementType::Morbidity.movement_code(), MovementCode::Off);
        assert_eq!(MovementType::NotTaken.movement_code(), MovementCode::Off);
    }

    #[test]
    fn test_from_outcome_populates_all_fields() {
        let outcome = MovementOutcome::new(MovementType::Death, TransactionType::Death);
        let movement = MovementRecord::from_outcome(&record(), &outcome);

        assert_eq!(movement.movement_code, MovementCode::Off);
        assert_eq!(movement.movement_type_text.as_deref(), Some("Death"));
        assert_eq!(
            movement.transaction_type_text.as_deref(),
            Some("Death (both lives for joint policies)")
        );
        assert_eq!(movement.transaction_code, Some(1));
        assert_eq!(movement.new_coverage_flag, None);
        assert!(movement.is_consistently_populated());
    }

    #[test]
    fn test_no_movement_is_consistent() {
        assert!(MovementRecord::no_movement(&record()).is_consistently_populated());
    }

    #[test]
    fn test_partial_population_detected() {
        let mut movement = MovementRecord::no_movement(&record());
        movement.transaction_code = Some(22);
        assert!(!movement.is_consistently_populated());

        let outcome = MovementOutcome::new(MovementType::Lapse, TransactionType::Lapse);
        let mut movement = MovementRecord::from_outcome(&record(), &outcome);
        movement.new_coverage_flag = Some(true);
        assert!(!movement.is_consistently_populated());

        let mut movement = MovementRecord::from_outcome(&record(), &MovementOutcome::new_business());
        movement.new_coverage_flag = None;
        assert!(!movement.is_consistently_populated());
    }
}
