//! Process-local intake store.
//!
//! Useful for hosts that keep the ledger elsewhere and only need a cache,
//! and for exercising ledger semantics without SQLite. Every operation
//! holds one mutex for its whole duration, which makes delete-most-recent
//! atomic with respect to concurrent appends and deletes.

use super::intake_repo::IntakeStore;
use super::{RepoError, RepoResult};
use crate::model::intake::IntakeRecord;
use crate::model::medication::MedicationId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryLedger {
    next_seq: u64,
    /// Per medication, kept sorted ascending by `(taken_at, seq)`.
    by_medication: HashMap<MedicationId, Vec<(u64, IntakeRecord)>>,
}

/// Mutex-guarded in-memory implementation of `IntakeStore`.
#[derive(Debug, Default)]
pub struct MemoryIntakeStore {
    inner: Mutex<MemoryLedger>,
}

impl MemoryIntakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all medications.
    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.lock()?.by_medication.values().map(Vec::len).sum())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryLedger>> {
        self.inner
            .lock()
            .map_err(|_| RepoError::Unavailable("intake store lock poisoned".to_string()))
    }
}

impl IntakeStore for MemoryIntakeStore {
    fn append(&self, record: &IntakeRecord) -> RepoResult<()> {
        let mut ledger = self.lock()?;
        ledger.next_seq += 1;
        let seq = ledger.next_seq;
        let entries = ledger.by_medication.entry(record.medication_id).or_default();
        let position = entries.partition_point(|(existing_seq, existing)| {
            (existing.taken_at, *existing_seq) <= (record.taken_at, seq)
        });
        entries.insert(position, (seq, record.clone()));
        Ok(())
    }

    fn delete_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        let mut ledger = self.lock()?;
        let removed = ledger
            .by_medication
            .get_mut(&medication_id)
            .and_then(Vec::pop)
            .map(|(_, record)| record);
        if ledger
            .by_medication
            .get(&medication_id)
            .is_some_and(Vec::is_empty)
        {
            ledger.by_medication.remove(&medication_id);
        }
        Ok(removed)
    }

    fn get_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        let ledger = self.lock()?;
        Ok(ledger
            .by_medication
            .get(&medication_id)
            .and_then(|entries| entries.last())
            .map(|(_, record)| record.clone()))
    }

    fn list_recent(
        &self,
        medication_id: MedicationId,
        limit: u32,
    ) -> RepoResult<Vec<IntakeRecord>> {
        let ledger = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(ledger
            .by_medication
            .get(&medication_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .take(limit)
                    .map(|(_, record)| record.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
