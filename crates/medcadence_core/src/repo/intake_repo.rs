//! Intake ledger store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist intake records per medication.
//! - Provide the atomic delete-most-recent primitive used by undo.
//!
//! # Invariants
//! - "Most recent" means highest `taken_at`, then highest insertion order.
//! - `delete_most_recent` removes at most one row, and it is the row that
//!   was most recent when the write lock was taken.
//! - Writes run in IMMEDIATE transactions so concurrent connections
//!   serialize on the database write lock.

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::intake::IntakeRecord;
use crate::model::medication::MedicationId;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::sync::Arc;

const INTAKE_COLUMNS: &str = "intake_id, medication_id, taken_at";

/// Outbound contract of the durable intake store.
pub trait IntakeStore {
    /// Appends one record.
    fn append(&self, record: &IntakeRecord) -> RepoResult<()>;
    /// Atomically removes and returns the most recent record, if any.
    fn delete_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>>;
    /// Returns the most recent record, if any.
    fn get_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>>;
    /// Returns up to `limit` records, newest first.
    fn list_recent(
        &self,
        medication_id: MedicationId,
        limit: u32,
    ) -> RepoResult<Vec<IntakeRecord>>;
}

impl<S: IntakeStore + ?Sized> IntakeStore for &S {
    fn append(&self, record: &IntakeRecord) -> RepoResult<()> {
        (**self).append(record)
    }

    fn delete_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        (**self).delete_most_recent(medication_id)
    }

    fn get_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        (**self).get_most_recent(medication_id)
    }

    fn list_recent(
        &self,
        medication_id: MedicationId,
        limit: u32,
    ) -> RepoResult<Vec<IntakeRecord>> {
        (**self).list_recent(medication_id, limit)
    }
}

impl<S: IntakeStore + ?Sized> IntakeStore for Arc<S> {
    fn append(&self, record: &IntakeRecord) -> RepoResult<()> {
        (**self).append(record)
    }

    fn delete_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        (**self).delete_most_recent(medication_id)
    }

    fn get_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        (**self).get_most_recent(medication_id)
    }

    fn list_recent(
        &self,
        medication_id: MedicationId,
        limit: u32,
    ) -> RepoResult<Vec<IntakeRecord>> {
        (**self).list_recent(medication_id, limit)
    }
}

/// SQLite-backed intake store over a migrated connection.
pub struct SqliteIntakeStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIntakeStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn begin_write(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl IntakeStore for SqliteIntakeStore<'_> {
    fn append(&self, record: &IntakeRecord) -> RepoResult<()> {
        let tx = self.begin_write()?;
        tx.execute(
            "INSERT INTO intakes (intake_id, medication_id, taken_at)
             VALUES (?1, ?2, ?3);",
            params![
                record.intake_id.to_string(),
                record.medication_id.to_string(),
                record.taken_at.timestamp_millis(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        let tx = self.begin_write()?;
        let removed = tx
            .query_row(
                &format!(
                    "DELETE FROM intakes
                     WHERE seq = (
                        SELECT seq
                        FROM intakes
                        WHERE medication_id = ?1
                        ORDER BY taken_at DESC, seq DESC
                        LIMIT 1
                     )
                     RETURNING {INTAKE_COLUMNS};"
                ),
                [medication_id.to_string()],
                read_raw_row,
            )
            .optional()?;
        tx.commit()?;
        removed.map(RawIntakeRow::into_record).transpose()
    }

    fn get_most_recent(&self, medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {INTAKE_COLUMNS}
                     FROM intakes
                     WHERE medication_id = ?1
                     ORDER BY taken_at DESC, seq DESC
                     LIMIT 1;"
                ),
                [medication_id.to_string()],
                read_raw_row,
            )
            .optional()?;
        raw.map(RawIntakeRow::into_record).transpose()
    }

    fn list_recent(
        &self,
        medication_id: MedicationId,
        limit: u32,
    ) -> RepoResult<Vec<IntakeRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INTAKE_COLUMNS}
             FROM intakes
             WHERE medication_id = ?1
             ORDER BY taken_at DESC, seq DESC
             LIMIT ?2;"
        ))?;
        let rows = stmt.query_map(
            params![medication_id.to_string(), i64::from(limit)],
            read_raw_row,
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}

struct RawIntakeRow {
    intake_id: String,
    medication_id: String,
    taken_at: i64,
}

impl RawIntakeRow {
    fn into_record(self) -> RepoResult<IntakeRecord> {
        let taken_at = DateTime::<Utc>::from_timestamp_millis(self.taken_at).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{}` in intakes.taken_at",
                self.taken_at
            ))
        })?;
        Ok(IntakeRecord {
            intake_id: parse_uuid(&self.intake_id, "intakes.intake_id")?,
            medication_id: parse_uuid(&self.medication_id, "intakes.medication_id")?,
            taken_at,
        })
    }
}

fn read_raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawIntakeRow> {
    Ok(RawIntakeRow {
        intake_id: row.get("intake_id")?,
        medication_id: row.get("medication_id")?,
        taken_at: row.get("taken_at")?,
    })
}
