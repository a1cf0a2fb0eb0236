//! Due-instant calculation.
//!
//! # Responsibility
//! - Compute the next due instant of a schedule from the last intake.
//! - Decide whether a dose is due now and whether it was just taken.
//!
//! # Invariants
//! - Pure: results depend only on the arguments, `now` included.
//! - Daily slots are computed in the zone passed by the caller. This
//!   module never consults the host zone.
//! - A daily slot whose window closed without an intake stays due until a
//!   new intake is recorded. There is no separate "missed" state.

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::model::schedule::{Schedule, TimeOfDay};

/// Combined calculator output for one schedule at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueStatus {
    /// Nominal instant of the next dose. May lie in the past.
    pub next_due: DateTime<Utc>,
    /// True once `now` reaches the opening of the due window.
    pub is_due_now: bool,
    /// True when the dose is late: a daily slot closed un-taken, or an
    /// interval dose is past `next_due + tolerance`.
    pub overdue: bool,
}

/// Evaluates `schedule` at `now` given the most recent intake.
pub fn evaluate_due(
    now: DateTime<Utc>,
    last_intake: Option<DateTime<Utc>>,
    schedule: &Schedule,
    zone: &Tz,
    tolerance: Duration,
) -> DueStatus {
    match *schedule {
        Schedule::Interval { every_hours } => match last_intake {
            None => DueStatus {
                next_due: now,
                is_due_now: true,
                overdue: false,
            },
            Some(last) => {
                let next_due = add_or_saturate(last, Duration::hours(i64::from(every_hours)));
                DueStatus {
                    next_due,
                    is_due_now: now >= sub_or_saturate(next_due, tolerance),
                    overdue: now > add_or_saturate(next_due, tolerance),
                }
            }
        },
        Schedule::Daily { at } => evaluate_daily(now, last_intake, at, zone, tolerance),
    }
}

fn evaluate_daily(
    now: DateTime<Utc>,
    last_intake: Option<DateTime<Utc>>,
    at: TimeOfDay,
    zone: &Tz,
    tolerance: Duration,
) -> DueStatus {
    let today = now.with_timezone(zone).date_naive();
    let slot = local_slot(today, at, zone);
    let next_slot = local_slot(today.checked_add_days(Days::new(1)).unwrap_or(today), at, zone);
    let window_opens = sub_or_saturate(slot, tolerance);
    let window_closes = add_or_saturate(slot, tolerance);

    let taken_in_window = last_intake
        .map(|last| last >= window_opens && last <= window_closes)
        .unwrap_or(false);

    if taken_in_window {
        return DueStatus {
            next_due: next_slot,
            is_due_now: now >= sub_or_saturate(next_slot, tolerance),
            overdue: false,
        };
    }

    if now < window_closes {
        return DueStatus {
            next_due: slot,
            is_due_now: now >= window_opens,
            overdue: false,
        };
    }

    // Today's window closed. A late intake after the window still counts
    // for today; without one the slot stays due until the next intake.
    let taken_late = last_intake
        .map(|last| last > window_closes)
        .unwrap_or(false);
    let overdue = !taken_late;
    DueStatus {
        next_due: next_slot,
        is_due_now: overdue || now >= sub_or_saturate(next_slot, tolerance),
        overdue,
    }
}

/// Returns the next due instant for `schedule`.
pub fn next_due(
    now: DateTime<Utc>,
    last_intake: Option<DateTime<Utc>>,
    schedule: &Schedule,
    zone: &Tz,
    tolerance: Duration,
) -> DateTime<Utc> {
    evaluate_due(now, last_intake, schedule, zone, tolerance).next_due
}

/// Returns whether a dose of `schedule` is due at `now`.
pub fn is_due_now(
    now: DateTime<Utc>,
    last_intake: Option<DateTime<Utc>>,
    schedule: &Schedule,
    zone: &Tz,
    tolerance: Duration,
) -> bool {
    evaluate_due(now, last_intake, schedule, zone, tolerance).is_due_now
}

/// True iff an intake exists and `0 <= now - last_intake <= recent_window`.
pub fn recently_taken(
    now: DateTime<Utc>,
    last_intake: Option<DateTime<Utc>>,
    recent_window: Duration,
) -> bool {
    match last_intake {
        Some(last) => {
            let elapsed = now.signed_duration_since(last);
            elapsed >= Duration::zero() && elapsed <= recent_window
        }
        None => false,
    }
}

/// Resolves `date` at `at` in `zone` to a UTC instant.
///
/// Ambiguous local times (clock set back) resolve to the earlier instant.
/// Non-existent local times (clock set forward) shift one hour later.
pub(crate) fn local_slot(date: NaiveDate, at: TimeOfDay, zone: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(at.to_naive_time());
    if let Some(resolved) = zone.from_local_datetime(&naive).earliest() {
        return resolved.with_timezone(&Utc);
    }
    let shifted = naive + Duration::hours(1);
    match zone.from_local_datetime(&shifted).earliest() {
        Some(resolved) => resolved.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

fn add_or_saturate(instant: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    instant
        .checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn sub_or_saturate(instant: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    instant
        .checked_sub_signed(delta)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
