//! Presentational label for the next due instant.
//!
//! Labels are display-only output and are never parsed back.

use chrono::{DateTime, Days, Utc};
use chrono_tz::Tz;

const TOMORROW_PREFIX: &str = "Tomorrow ";

/// Formats `next_due` relative to `now` in `zone`.
///
/// - Next calendar day: `"Tomorrow 9:00 am"`.
/// - Any other day: time only, e.g. `"2:30 pm"`.
pub fn format_next_label(next_due: DateTime<Utc>, now: DateTime<Utc>, zone: &Tz) -> String {
    let local_due = next_due.with_timezone(zone);
    let today = now.with_timezone(zone).date_naive();
    let time = local_due.format("%-I:%M %P").to_string();

    match today.checked_add_days(Days::new(1)) {
        Some(tomorrow) if local_due.date_naive() == tomorrow => format!("{TOMORROW_PREFIX}{time}"),
        _ => time,
    }
}
