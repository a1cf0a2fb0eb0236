//! Medication and schedule store contract and SQLite implementation.
//!
//! # Responsibility
//! - List a user's medications in their display order.
//! - Fetch each medication's raw schedule record.
//!
//! # Invariants
//! - Schedule records are returned verbatim; validation happens in
//!   `ScheduleRecord::resolve`, so malformed rows stay observable.
//! - A medication without a schedule row yields `None`, not an error.

use super::{parse_uuid, RepoResult};
use crate::model::medication::{Medication, MedicationId, UserId};
use crate::model::schedule::ScheduleRecord;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Read-only outbound contract of the schedule store.
pub trait ScheduleStore {
    /// Medications of `user_id`, in display order.
    fn list_medications(&self, user_id: UserId) -> RepoResult<Vec<Medication>>;
    fn get_medication(&self, medication_id: MedicationId) -> RepoResult<Option<Medication>>;
    fn get_schedule(&self, medication_id: MedicationId) -> RepoResult<Option<ScheduleRecord>>;
}

/// SQLite-backed medication/schedule store.
pub struct SqliteMedicationStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMedicationStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Registers a medication at the end of the user's list.
    pub fn insert_medication(&self, user_id: UserId, name: &str) -> RepoResult<MedicationId> {
        let medication_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO medications (id, user_id, name, position)
             SELECT ?1, ?2, ?3, COALESCE(MAX(position) + 1, 0)
             FROM medications
             WHERE user_id = ?2;",
            params![medication_id.to_string(), user_id.to_string(), name],
        )?;
        Ok(medication_id)
    }

    /// Stores `record` verbatim, replacing any previous schedule row.
    pub fn put_schedule_record(
        &self,
        medication_id: MedicationId,
        record: &ScheduleRecord,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO medication_schedules (
                medication_id,
                schedule_type,
                interval_hours,
                time_of_day,
                time_zone
             ) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (medication_id) DO UPDATE SET
                schedule_type = excluded.schedule_type,
                interval_hours = excluded.interval_hours,
                time_of_day = excluded.time_of_day,
                time_zone = excluded.time_zone;",
            params![
                medication_id.to_string(),
                record.kind.as_deref(),
                record.interval_hours,
                record.time_of_day.as_deref(),
                record.time_zone.as_deref(),
            ],
        )?;
        Ok(())
    }
}

impl ScheduleStore for SqliteMedicationStore<'_> {
    fn list_medications(&self, user_id: UserId) -> RepoResult<Vec<Medication>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name
             FROM medications
             WHERE user_id = ?1
             ORDER BY position ASC, created_at ASC, id ASC;",
        )?;
        let rows = stmt.query_map([user_id.to_string()], read_medication_columns)?;

        let mut medications = Vec::new();
        for row in rows {
            let (id, user, name) = row?;
            medications.push(Medication {
                medication_id: parse_uuid(&id, "medications.id")?,
                user_id: parse_uuid(&user, "medications.user_id")?,
                name,
            });
        }
        Ok(medications)
    }

    fn get_medication(&self, medication_id: MedicationId) -> RepoResult<Option<Medication>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, name FROM medications WHERE id = ?1;",
                [medication_id.to_string()],
                read_medication_columns,
            )
            .optional()?;

        match row {
            Some((id, user, name)) => Ok(Some(Medication {
                medication_id: parse_uuid(&id, "medications.id")?,
                user_id: parse_uuid(&user, "medications.user_id")?,
                name,
            })),
            None => Ok(None),
        }
    }

    fn get_schedule(&self, medication_id: MedicationId) -> RepoResult<Option<ScheduleRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT schedule_type, interval_hours, time_of_day, time_zone
                 FROM medication_schedules
                 WHERE medication_id = ?1;",
                [medication_id.to_string()],
                |row| {
                    Ok(ScheduleRecord {
                        kind: row.get("schedule_type")?,
                        interval_hours: row.get("interval_hours")?,
                        time_of_day: row.get("time_of_day")?,
                        time_zone: row.get("time_zone")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}

fn read_medication_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String)> {
    Ok((row.get("id")?, row.get("user_id")?, row.get("name")?))
}
