//! Per-medication adherence view.
//!
//! # Responsibility
//! - Combine calculator output into the status shown to the user.
//! - Resolve the effective zone for one medication.
//!
//! # Invariants
//! - Views are derived per request and never stored.
//! - An explicit schedule zone wins over the caller zone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::due::{evaluate_due, recently_taken};
use super::label::format_next_label;
use crate::config::AdherenceConfig;
use crate::model::intake::IntakeRecord;
use crate::model::medication::{Medication, MedicationId};
use crate::model::schedule::{Schedule, ScheduleDefinition};

/// Human-facing status bucket, ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceState {
    /// Due window passed without a dose.
    Overdue,
    /// Inside the due window.
    DueNow,
    /// Not due, and a dose was logged within the recency window.
    RecentlyTaken,
    /// Not due yet.
    Upcoming,
}

/// Derived status of one medication at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdherenceView {
    pub medication_id: MedicationId,
    pub name: String,
    pub schedule: Schedule,
    /// IANA name of the zone used for daily slots and the label.
    pub time_zone: String,
    pub next_due_at: DateTime<Utc>,
    pub is_due_now: bool,
    pub recently_taken: bool,
    pub last_taken_at: Option<DateTime<Utc>>,
    pub state: AdherenceState,
    pub label: String,
}

/// Picks the schedule's own zone when set, else the caller's.
pub fn effective_zone(definition: &ScheduleDefinition, caller_zone: Tz) -> Tz {
    definition.time_zone.unwrap_or(caller_zone)
}

/// Builds the view for `medication` from its schedule and latest intake.
pub fn derive_view(
    medication: &Medication,
    definition: &ScheduleDefinition,
    latest: Option<&IntakeRecord>,
    now: DateTime<Utc>,
    caller_zone: Tz,
    config: &AdherenceConfig,
) -> AdherenceView {
    let zone = effective_zone(definition, caller_zone);
    let last_taken_at = latest.map(|record| record.taken_at);
    let due = evaluate_due(
        now,
        last_taken_at,
        &definition.schedule,
        &zone,
        config.tolerance_window,
    );
    let recent = recently_taken(now, last_taken_at, config.recent_window);

    let state = if due.is_due_now && due.overdue {
        AdherenceState::Overdue
    } else if due.is_due_now {
        AdherenceState::DueNow
    } else if recent {
        AdherenceState::RecentlyTaken
    } else {
        AdherenceState::Upcoming
    };

    AdherenceView {
        medication_id: medication.medication_id,
        name: medication.name.clone(),
        schedule: definition.schedule,
        time_zone: zone.name().to_string(),
        next_due_at: due.next_due,
        is_due_now: due.is_due_now,
        recently_taken: recent,
        last_taken_at,
        state,
        label: format_next_label(due.next_due, now, &zone),
    }
}
