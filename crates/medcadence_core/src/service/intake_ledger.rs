//! Intake ledger service.
//!
//! # Responsibility
//! - Record intakes and undo the most recent one per medication.
//! - Report storage failures instead of converting them into success.
//!
//! # Invariants
//! - Undo delegates to the store's atomic delete-most-recent primitive;
//!   it never reads an id and deletes it in a second step.
//! - Undo on an empty history is a successful no-op.

use crate::model::intake::{IntakeId, IntakeRecord};
use crate::model::medication::MedicationId;
use crate::repo::intake_repo::IntakeStore;
use crate::repo::RepoResult;
use chrono::{DateTime, Utc};
use log::{error, info};

const HISTORY_DEFAULT_LIMIT: u32 = 20;
const HISTORY_LIMIT_MAX: u32 = 100;

/// Append-only intake log over an `IntakeStore`.
pub struct IntakeLedger<S: IntakeStore> {
    store: S,
}

impl<S: IntakeStore> IntakeLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Appends a new intake taken at `taken_at` and returns its id.
    ///
    /// Each call creates a distinct record; callers retrying after a
    /// failure must deduplicate by intent themselves.
    pub fn record_intake(
        &self,
        medication_id: MedicationId,
        taken_at: DateTime<Utc>,
    ) -> RepoResult<IntakeId> {
        let record = IntakeRecord::new(medication_id, taken_at);
        match self.store.append(&record) {
            Ok(()) => {
                info!(
                    "event=intake_record module=ledger status=ok medication_id={medication_id} intake_id={}",
                    record.intake_id
                );
                Ok(record.intake_id)
            }
            Err(err) => {
                error!(
                    "event=intake_record module=ledger status=error medication_id={medication_id} retryable={} error={err}",
                    err.is_retryable()
                );
                Err(err)
            }
        }
    }

    /// Removes the most recent intake of `medication_id`.
    ///
    /// Returns the removed record, or `None` when there was nothing to undo.
    pub fn undo_latest(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        match self.store.delete_most_recent(medication_id) {
            Ok(removed) => {
                info!(
                    "event=intake_undo module=ledger status=ok medication_id={medication_id} removed={}",
                    u8::from(removed.is_some())
                );
                Ok(removed)
            }
            Err(err) => {
                error!(
                    "event=intake_undo module=ledger status=error medication_id={medication_id} retryable={} error={err}",
                    err.is_retryable()
                );
                Err(err)
            }
        }
    }

    pub fn latest(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        self.store.get_most_recent(medication_id)
    }

    /// Newest-first intake history. Limit defaults to 20 and clamps to 100.
    pub fn history(
        &self,
        medication_id: MedicationId,
        limit: Option<u32>,
    ) -> RepoResult<Vec<IntakeRecord>> {
        let limit = limit
            .unwrap_or(HISTORY_DEFAULT_LIMIT)
            .clamp(1, HISTORY_LIMIT_MAX);
        self.store.list_recent(medication_id, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::IntakeLedger;
    use crate::repo::memory_store::MemoryIntakeStore;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn history_clamps_limit() {
        let ledger = IntakeLedger::new(MemoryIntakeStore::new());
        let med = Uuid::new_v4();
        let base = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        for hour in 0..120 {
            ledger
                .record_intake(med, base + Duration::hours(hour))
                .unwrap();
        }

        assert_eq!(ledger.history(med, None).unwrap().len(), 20);
        assert_eq!(ledger.history(med, Some(500)).unwrap().len(), 100);
        let one = ledger.history(med, Some(0)).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].taken_at, base + Duration::hours(119));
    }
}
