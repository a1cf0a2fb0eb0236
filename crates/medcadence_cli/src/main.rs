//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `medcadence_core` linkage.
//! - Run one mark-taken / status / undo pass against an in-memory store.

use chrono::Utc;
use medcadence_core::db::open_db_in_memory;
use medcadence_core::{
    AdherenceConfig, AdherenceService, ScheduleRecord, SqliteIntakeStore, SqliteMedicationStore,
    StatusOrder,
};
use std::process::ExitCode;
use uuid::Uuid;

fn main() -> ExitCode {
    println!("medcadence_core ping={}", medcadence_core::ping());
    println!("medcadence_core version={}", medcadence_core::core_version());

    // Optional first argument: IANA zone for the demo read.
    let zone = std::env::args().nth(1);
    match run_demo(zone.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_demo(zone: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let medications = SqliteMedicationStore::new(&conn);
    let user = Uuid::new_v4();
    let medication = medications.insert_medication(user, "Prenatal vitamin")?;
    medications.put_schedule_record(
        medication,
        &ScheduleRecord {
            kind: Some("daily".to_string()),
            time_of_day: Some("09:00".to_string()),
            ..ScheduleRecord::default()
        },
    )?;

    let service = AdherenceService::new(
        medications,
        SqliteIntakeStore::new(&conn),
        AdherenceConfig::default(),
    );
    let now = Utc::now();
    let user_id = user.to_string();
    let medication_id = medication.to_string();

    print_statuses(&service, &user_id, zone, "before")?;
    let intake = service.mark_taken(&medication_id, now)?;
    println!("marked taken intake_id={intake}");
    print_statuses(&service, &user_id, zone, "after_mark")?;

    let outcome = service.undo(&medication_id, zone, Utc::now())?;
    println!("undo removed={}", outcome.removed.is_some());
    match outcome.view {
        Ok(view) => println!("after_undo state={:?} next=\"{}\"", view.state, view.label),
        Err(err) => println!("after_undo view unavailable: {err}"),
    }
    Ok(())
}

fn print_statuses(
    service: &AdherenceService<SqliteMedicationStore<'_>, SqliteIntakeStore<'_>>,
    user_id: &str,
    zone: Option<&str>,
    stage: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = service.list_statuses(user_id, zone, Utc::now(), StatusOrder::Input)?;
    for view in &report.views {
        println!(
            "{stage} state={:?} due_now={} recent={} next=\"{}\" zone={}",
            view.state, view.is_due_now, view.recently_taken, view.label, view.time_zone
        );
    }
    Ok(())
}
