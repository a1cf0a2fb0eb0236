//! Inbound adherence entry points for host request handlers.
//!
//! # Responsibility
//! - Validate raw identifiers and zone names before any storage access.
//! - Expose the read, mark-taken and undo use-cases.
//!
//! # Invariants
//! - Validation errors never reach the ledger.
//! - A missing caller zone falls back to `AdherenceConfig::default_time_zone`.
//! - Once an undo has been applied it is reported as applied, even when
//!   the follow-up view cannot be derived.

use crate::adherence::view::AdherenceView;
use crate::config::AdherenceConfig;
use crate::model::intake::{IntakeId, IntakeRecord};
use crate::model::medication::{Medication, MedicationId};
use crate::model::schedule::{parse_time_zone, ScheduleError};
use crate::repo::intake_repo::IntakeStore;
use crate::repo::medication_repo::ScheduleStore;
use crate::repo::RepoError;
use crate::service::intake_ledger::IntakeLedger;
use crate::service::status_aggregator::{
    MedicationStatusAggregator, StatusEntryError, StatusOrder, StatusReport,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Client-input faults. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier was absent or blank.
    MissingIdentifier(&'static str),
    /// Identifier is not a UUID.
    InvalidIdentifier { field: &'static str, value: String },
    /// Zone name or schedule input is malformed.
    Schedule(ScheduleError),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdentifier(field) => write!(f, "{field} is required"),
            Self::InvalidIdentifier { field, value } => {
                write!(f, "{field} is not a valid identifier: `{value}`")
            }
            Self::Schedule(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schedule(err) => Some(err),
            Self::MissingIdentifier(_) | Self::InvalidIdentifier { .. } => None,
        }
    }
}

/// Errors from inbound adherence operations.
#[derive(Debug)]
pub enum AdherenceError {
    Validation(ValidationError),
    MedicationNotFound(MedicationId),
    Storage(RepoError),
}

impl AdherenceError {
    /// True only for storage faults; validation and not-found are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_retryable(),
            Self::Validation(_) | Self::MedicationNotFound(_) => false,
        }
    }
}

impl Display for AdherenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid input: {err}"),
            Self::MedicationNotFound(id) => write!(f, "medication not found: {id}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for AdherenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::MedicationNotFound(_) => None,
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<ValidationError> for AdherenceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for AdherenceError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

pub type AdherenceResult<T> = Result<T, AdherenceError>;

/// Result of an applied undo.
#[derive(Debug)]
pub struct UndoOutcome {
    /// Removed record; `None` when the history was already empty.
    pub removed: Option<IntakeRecord>,
    /// Fresh view of the medication after the undo.
    pub view: Result<AdherenceView, StatusEntryError>,
}

/// Inbound read/write use-cases over a schedule store and intake ledger.
pub struct AdherenceService<M: ScheduleStore, S: IntakeStore> {
    schedules: M,
    ledger: IntakeLedger<S>,
    config: AdherenceConfig,
}

impl<M: ScheduleStore, S: IntakeStore> AdherenceService<M, S> {
    pub fn new(schedules: M, intakes: S, config: AdherenceConfig) -> Self {
        Self {
            schedules,
            ledger: IntakeLedger::new(intakes),
            config,
        }
    }

    pub fn ledger(&self) -> &IntakeLedger<S> {
        &self.ledger
    }

    pub fn config(&self) -> &AdherenceConfig {
        &self.config
    }

    /// Lists the user's medications with their adherence views.
    ///
    /// `time_zone = None` (or blank) uses the configured default zone.
    pub fn list_statuses(
        &self,
        user_id: &str,
        time_zone: Option<&str>,
        now: DateTime<Utc>,
        order: StatusOrder,
    ) -> AdherenceResult<StatusReport> {
        let user_id = parse_identifier("user_id", user_id)?;
        let zone = self.resolve_zone(time_zone)?;
        Ok(self
            .aggregator()
            .statuses_for_user(user_id, now, zone, order)?)
    }

    /// Records an intake at `now` and returns its id.
    pub fn mark_taken(&self, medication_id: &str, now: DateTime<Utc>) -> AdherenceResult<IntakeId> {
        let medication_id = parse_identifier("medication_id", medication_id)?;
        self.require_medication(medication_id)?;
        Ok(self.ledger.record_intake(medication_id, now)?)
    }

    /// Undoes the latest intake and returns the re-derived view.
    pub fn undo(
        &self,
        medication_id: &str,
        time_zone: Option<&str>,
        now: DateTime<Utc>,
    ) -> AdherenceResult<UndoOutcome> {
        let medication_id = parse_identifier("medication_id", medication_id)?;
        let zone = self.resolve_zone(time_zone)?;
        let medication = self.require_medication(medication_id)?;

        let removed = self.ledger.undo_latest(medication_id)?;
        let view = self.aggregator().status_for(&medication, now, zone);
        if let Err(err) = &view {
            warn!(
                "event=undo_view module=service status=degraded medication_id={medication_id} error={err}"
            );
        }
        Ok(UndoOutcome { removed, view })
    }

    /// Newest-first intake history of one medication.
    pub fn history(
        &self,
        medication_id: &str,
        limit: Option<u32>,
    ) -> AdherenceResult<Vec<IntakeRecord>> {
        let medication_id = parse_identifier("medication_id", medication_id)?;
        self.require_medication(medication_id)?;
        Ok(self.ledger.history(medication_id, limit)?)
    }

    fn aggregator(&self) -> MedicationStatusAggregator<'_, M, S> {
        MedicationStatusAggregator::new(&self.schedules, &self.ledger, self.config)
    }

    fn require_medication(&self, medication_id: MedicationId) -> AdherenceResult<Medication> {
        self.schedules
            .get_medication(medication_id)?
            .ok_or(AdherenceError::MedicationNotFound(medication_id))
    }

    fn resolve_zone(&self, time_zone: Option<&str>) -> Result<Tz, ValidationError> {
        match time_zone.map(str::trim) {
            None | Some("") => Ok(self.config.default_time_zone),
            Some(name) => parse_time_zone(name).map_err(ValidationError::Schedule),
        }
    }
}

fn parse_identifier(field: &'static str, value: &str) -> Result<Uuid, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingIdentifier(field));
    }
    Uuid::parse_str(trimmed).map_err(|_| ValidationError::InvalidIdentifier {
        field,
        value: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_identifier, ValidationError};

    #[test]
    fn parse_identifier_distinguishes_missing_from_invalid() {
        assert_eq!(
            parse_identifier("medication_id", "   "),
            Err(ValidationError::MissingIdentifier("medication_id"))
        );
        assert!(matches!(
            parse_identifier("medication_id", "pill-1"),
            Err(ValidationError::InvalidIdentifier { .. })
        ));
        assert!(parse_identifier("user_id", "67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
    }
}
