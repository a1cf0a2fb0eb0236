//! Intake record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::medication::MedicationId;

/// Stable identifier of one intake event.
pub type IntakeId = Uuid;

/// One logged dose of one medication.
///
/// Records are append-only: the ledger never edits them, and only the
/// most recent record of a medication may be removed (undo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub intake_id: IntakeId,
    pub medication_id: MedicationId,
    pub taken_at: DateTime<Utc>,
}

impl IntakeRecord {
    /// Creates a record with a freshly generated intake id.
    pub fn new(medication_id: MedicationId, taken_at: DateTime<Utc>) -> Self {
        Self {
            intake_id: Uuid::new_v4(),
            medication_id,
            taken_at,
        }
    }
}
