//! Medication identity model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a medication entry.
pub type MedicationId = Uuid;

/// Stable identifier of the user owning a medication list.
pub type UserId = Uuid;

/// Medication entry as listed for one user.
///
/// The schedule is fetched separately; an entry may exist without a
/// resolvable schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub medication_id: MedicationId,
    pub user_id: UserId,
    /// Display name. Never written to logs.
    pub name: String,
}
