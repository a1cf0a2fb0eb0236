use chrono::{DateTime, Duration, TimeZone, Utc};
use medcadence_core::db::open_db_in_memory;
use medcadence_core::{
    AdherenceConfig, AdherenceError, AdherenceService, AdherenceState, IntakeLedger,
    IntakeRecord, IntakeStore, Medication, MedicationId, MedicationStatusAggregator, RepoError,
    RepoResult, ScheduleIssue, ScheduleRecord, ScheduleStore, SqliteIntakeStore,
    SqliteMedicationStore, StatusOrder, UserId, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn today(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 14, hour, minute, 0).unwrap()
}

fn tomorrow(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 15, hour, minute, 0).unwrap()
}

fn daily(time: &str) -> ScheduleRecord {
    ScheduleRecord {
        kind: Some("daily".to_string()),
        time_of_day: Some(time.to_string()),
        ..ScheduleRecord::default()
    }
}

fn every(hours: i64) -> ScheduleRecord {
    ScheduleRecord {
        kind: Some("interval".to_string()),
        interval_hours: Some(hours),
        ..ScheduleRecord::default()
    }
}

fn add_medication(conn: &Connection, user: UserId, schedule: Option<ScheduleRecord>) -> Uuid {
    let store = SqliteMedicationStore::new(conn);
    let id = store.insert_medication(user, "Prenatal vitamin").unwrap();
    if let Some(record) = schedule {
        store.put_schedule_record(id, &record).unwrap();
    }
    id
}

fn service(
    conn: &Connection,
) -> AdherenceService<SqliteMedicationStore<'_>, SqliteIntakeStore<'_>> {
    AdherenceService::new(
        SqliteMedicationStore::new(conn),
        SqliteIntakeStore::new(conn),
        AdherenceConfig::default(),
    )
}

#[test]
fn daily_before_slot_is_due_with_same_day_label() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let med = add_medication(&conn, user, Some(daily("09:00")));

    let report = service(&conn)
        .list_statuses(&user.to_string(), None, today(8, 45), StatusOrder::Input)
        .unwrap();

    assert!(report.is_complete());
    let view = &report.views[0];
    assert_eq!(view.medication_id, med);
    assert!(view.is_due_now);
    assert_eq!(view.next_due_at, today(9, 0));
    assert_eq!(view.label, "9:00 am");
    assert_eq!(view.state, AdherenceState::DueNow);
}

#[test]
fn interval_past_due_reports_nominal_instant_in_the_past() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let med = add_medication(&conn, user, Some(every(8)));
    let svc = service(&conn);
    let now = today(18, 0);
    let last = now - Duration::hours(9);

    svc.mark_taken(&med.to_string(), last).unwrap();
    let report = svc
        .list_statuses(&user.to_string(), None, now, StatusOrder::Input)
        .unwrap();

    let view = &report.views[0];
    assert!(view.is_due_now);
    assert_eq!(view.next_due_at, last + Duration::hours(8));
    assert!(view.next_due_at < now);
    assert_eq!(view.state, AdherenceState::Overdue);
}

#[test]
fn daily_taken_within_tolerance_rolls_to_tomorrow() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let med = add_medication(&conn, user, Some(daily("09:00")));
    let svc = service(&conn);

    svc.mark_taken(&med.to_string(), today(9, 10)).unwrap();
    let report = svc
        .list_statuses(&user.to_string(), None, today(14, 0), StatusOrder::Input)
        .unwrap();

    let view = &report.views[0];
    assert_eq!(view.next_due_at, tomorrow(9, 0));
    assert_eq!(view.label, "Tomorrow 9:00 am");
    assert!(!view.is_due_now);
    assert!(!view.recently_taken);
    assert_eq!(view.last_taken_at, Some(today(9, 10)));
    assert_eq!(view.state, AdherenceState::Upcoming);
}

#[test]
fn mark_taken_then_undo_restores_empty_history() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let med = add_medication(&conn, user, Some(daily("09:00")));
    let svc = service(&conn);
    let med_id = med.to_string();

    let intake_id = svc.mark_taken(&med_id, today(9, 0)).unwrap();
    let outcome = svc.undo(&med_id, None, today(9, 1)).unwrap();

    assert_eq!(outcome.removed.map(|record| record.intake_id), Some(intake_id));
    assert!(svc.history(&med_id, None).unwrap().is_empty());
    let view = outcome.view.unwrap();
    assert_eq!(view.last_taken_at, None);
    assert!(view.is_due_now);
    assert_eq!(view.next_due_at, today(9, 0));

    let second = svc.undo(&med_id, None, today(9, 2)).unwrap();
    assert!(second.removed.is_none());
    assert!(svc.history(&med_id, None).unwrap().is_empty());
}

#[test]
fn caller_zone_drives_daily_slot_and_label() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    add_medication(&conn, user, Some(daily("09:00")));

    // 08:45 in Tokyo on 2026-07-15.
    let now = Utc.with_ymd_and_hms(2026, 7, 14, 23, 45, 0).unwrap();
    let report = service(&conn)
        .list_statuses(&user.to_string(), Some("Asia/Tokyo"), now, StatusOrder::Input)
        .unwrap();

    let view = &report.views[0];
    assert_eq!(view.time_zone, "Asia/Tokyo");
    assert_eq!(view.next_due_at, tomorrow(0, 0));
    assert!(view.is_due_now);
    assert_eq!(view.label, "9:00 am");
}

#[test]
fn missing_zone_uses_configured_default() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    add_medication(&conn, user, Some(daily("09:00")));
    let config = AdherenceConfig::default().with_default_time_zone(chrono_tz::Tz::Asia__Tokyo);
    let svc = AdherenceService::new(
        SqliteMedicationStore::new(&conn),
        SqliteIntakeStore::new(&conn),
        config,
    );

    let report = svc
        .list_statuses(&user.to_string(), Some("  "), today(1, 0), StatusOrder::Input)
        .unwrap();
    assert_eq!(report.views[0].time_zone, "Asia/Tokyo");
}

#[test]
fn bad_records_are_skipped_and_order_is_preserved() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let first = add_medication(&conn, user, Some(daily("21:00")));
    let no_schedule = add_medication(&conn, user, None);
    let malformed = add_medication(&conn, user, Some(daily("25:00")));
    let last = add_medication(&conn, user, Some(every(4)));

    let report = service(&conn)
        .list_statuses(&user.to_string(), None, today(12, 0), StatusOrder::Input)
        .unwrap();

    let ids: Vec<_> = report.views.iter().map(|view| view.medication_id).collect();
    assert_eq!(ids, vec![first, last]);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.skipped[0].medication_id, no_schedule);
    assert_eq!(report.skipped[0].issue, ScheduleIssue::Missing);
    assert_eq!(report.skipped[1].medication_id, malformed);
    assert!(matches!(report.skipped[1].issue, ScheduleIssue::Malformed(_)));
    assert!(report.faults.is_empty());
    assert!(!report.is_complete());
}

#[test]
fn urgency_order_puts_overdue_first() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let upcoming = add_medication(&conn, user, Some(daily("21:00")));
    let overdue = add_medication(&conn, user, Some(daily("08:00")));
    let due_now = add_medication(&conn, user, Some(every(6)));

    let report = service(&conn)
        .list_statuses(&user.to_string(), None, today(12, 0), StatusOrder::Urgency)
        .unwrap();

    let ids: Vec<_> = report.views.iter().map(|view| view.medication_id).collect();
    assert_eq!(ids, vec![overdue, due_now, upcoming]);
    assert_eq!(report.views[0].state, AdherenceState::Overdue);
}

#[test]
fn validation_errors_are_raised_before_storage_access() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let med = add_medication(&conn, user, Some(daily("09:00")));
    let svc = service(&conn);
    svc.mark_taken(&med.to_string(), today(9, 0)).unwrap();

    let missing = svc.mark_taken("", today(9, 0)).unwrap_err();
    assert!(matches!(
        missing,
        AdherenceError::Validation(ValidationError::MissingIdentifier("medication_id"))
    ));
    assert!(!missing.is_retryable());

    let bad_zone = svc
        .undo(&med.to_string(), Some("Atlantis/Capital"), today(9, 5))
        .unwrap_err();
    assert!(matches!(bad_zone, AdherenceError::Validation(_)));
    // The rejected undo must not have touched the ledger.
    assert_eq!(svc.history(&med.to_string(), None).unwrap().len(), 1);

    let unknown = Uuid::new_v4();
    let not_found = svc.mark_taken(&unknown.to_string(), today(9, 0)).unwrap_err();
    assert!(matches!(not_found, AdherenceError::MedicationNotFound(id) if id == unknown));
}

struct FailingScheduleStore<'conn> {
    inner: SqliteMedicationStore<'conn>,
    broken: MedicationId,
}

impl ScheduleStore for FailingScheduleStore<'_> {
    fn list_medications(&self, user_id: UserId) -> RepoResult<Vec<Medication>> {
        self.inner.list_medications(user_id)
    }

    fn get_medication(&self, medication_id: MedicationId) -> RepoResult<Option<Medication>> {
        self.inner.get_medication(medication_id)
    }

    fn get_schedule(&self, medication_id: MedicationId) -> RepoResult<Option<ScheduleRecord>> {
        if medication_id == self.broken {
            return Err(RepoError::Unavailable("schedule replica offline".to_string()));
        }
        self.inner.get_schedule(medication_id)
    }
}

#[test]
fn storage_fault_is_reported_separately_from_missing_schedule() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let healthy = add_medication(&conn, user, Some(daily("09:00")));
    let broken = add_medication(&conn, user, Some(daily("09:00")));
    let missing = add_medication(&conn, user, None);

    let schedules = FailingScheduleStore {
        inner: SqliteMedicationStore::new(&conn),
        broken,
    };
    let ledger = IntakeLedger::new(SqliteIntakeStore::new(&conn));
    let aggregator =
        MedicationStatusAggregator::new(&schedules, &ledger, AdherenceConfig::default());

    let report = aggregator
        .statuses_for_user(user, today(10, 0), chrono_tz::Tz::UTC, StatusOrder::Input)
        .unwrap();

    assert_eq!(report.views.len(), 1);
    assert_eq!(report.views[0].medication_id, healthy);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].medication_id, broken);
    assert!(report.faults[0].error.is_retryable());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].medication_id, missing);
}

#[test]
fn undecodable_schedule_row_is_skipped_not_reported_as_fault() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let healthy = add_medication(&conn, user, Some(every(8)));
    let corrupt = add_medication(&conn, user, None);
    conn.execute(
        "INSERT INTO medication_schedules (medication_id, schedule_type, interval_hours)
         VALUES (?1, 'interval', 'eight');",
        [corrupt.to_string()],
    )
    .unwrap();

    let report = service(&conn)
        .list_statuses(&user.to_string(), None, today(12, 0), StatusOrder::Input)
        .unwrap();

    assert_eq!(report.views.len(), 1);
    assert_eq!(report.views[0].medication_id, healthy);
    assert!(report.faults.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].medication_id, corrupt);
    assert!(matches!(report.skipped[0].issue, ScheduleIssue::Unreadable(_)));
}

/// Intake store whose writes always fail; reads see an empty ledger.
struct UnwritableIntakeStore;

impl IntakeStore for UnwritableIntakeStore {
    fn append(&self, _record: &IntakeRecord) -> RepoResult<()> {
        Err(RepoError::Unavailable("ledger primary offline".to_string()))
    }

    fn delete_most_recent(&self, _medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        Err(RepoError::Unavailable("ledger primary offline".to_string()))
    }

    fn get_most_recent(&self, _medication_id: MedicationId) -> RepoResult<Option<IntakeRecord>> {
        Ok(None)
    }

    fn list_recent(
        &self,
        _medication_id: MedicationId,
        _limit: u32,
    ) -> RepoResult<Vec<IntakeRecord>> {
        Ok(Vec::new())
    }
}

#[test]
fn write_failures_surface_as_retryable_storage_errors() {
    let conn = open_db_in_memory().unwrap();
    let user = Uuid::new_v4();
    let med = add_medication(&conn, user, Some(daily("09:00")));
    let svc = AdherenceService::new(
        SqliteMedicationStore::new(&conn),
        UnwritableIntakeStore,
        AdherenceConfig::default(),
    );

    let marked = svc.mark_taken(&med.to_string(), today(9, 0)).unwrap_err();
    assert!(matches!(marked, AdherenceError::Storage(RepoError::Unavailable(_))));
    assert!(marked.is_retryable());

    let undone = svc.undo(&med.to_string(), None, today(9, 5)).unwrap_err();
    assert!(matches!(undone, AdherenceError::Storage(RepoError::Unavailable(_))));
    assert!(undone.is_retryable());
}
