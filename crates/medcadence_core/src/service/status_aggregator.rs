//! Medication status aggregation.
//!
//! # Responsibility
//! - Build one `AdherenceView` per medication of a user.
//! - Apply the partial-failure policy to bad or unreachable records.
//!
//! # Invariants
//! - Output keeps input order unless urgency ordering is requested.
//! - A missing, malformed or undecodable schedule skips that medication
//!   with a warning.
//! - A per-medication storage fault is reported as a fault, never as a
//!   missing schedule.

use crate::adherence::view::{derive_view, AdherenceView};
use crate::config::AdherenceConfig;
use crate::model::medication::{Medication, MedicationId, UserId};
use crate::model::schedule::ScheduleError;
use crate::repo::intake_repo::IntakeStore;
use crate::repo::medication_repo::ScheduleStore;
use crate::repo::{RepoError, RepoResult};
use crate::service::intake_ledger::IntakeLedger;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ordering of the aggregated list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusOrder {
    /// Same order as the user's medication list.
    #[default]
    Input,
    /// Most urgent state first, then earliest `next_due_at`.
    Urgency,
}

/// Why a medication has no derivable schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleIssue {
    Missing,
    Malformed(ScheduleError),
    /// Stored row could not be decoded at all.
    Unreadable(String),
}

impl Display for ScheduleIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "no schedule defined"),
            Self::Malformed(err) => write!(f, "malformed schedule: {err}"),
            Self::Unreadable(detail) => write!(f, "unreadable schedule row: {detail}"),
        }
    }
}

/// Failure deriving the view of a single medication.
#[derive(Debug)]
pub enum StatusEntryError {
    /// Data inconsistency; not retryable.
    Inconsistent(ScheduleIssue),
    /// Storage fault while reading schedule or ledger.
    Storage(RepoError),
}

impl Display for StatusEntryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inconsistent(issue) => write!(f, "{issue}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StatusEntryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Inconsistent(ScheduleIssue::Malformed(err)) => Some(err),
            Self::Inconsistent(ScheduleIssue::Missing | ScheduleIssue::Unreadable(_)) => None,
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<RepoError> for StatusEntryError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Medication excluded because its schedule cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMedication {
    pub medication_id: MedicationId,
    pub issue: ScheduleIssue,
}

/// Medication excluded because storage failed while reading it.
#[derive(Debug)]
pub struct MedicationFault {
    pub medication_id: MedicationId,
    pub error: RepoError,
}

/// Aggregated statuses plus explicit indicators for excluded entries.
#[derive(Debug, Default)]
pub struct StatusReport {
    pub views: Vec<AdherenceView>,
    pub skipped: Vec<SkippedMedication>,
    pub faults: Vec<MedicationFault>,
}

impl StatusReport {
    /// True when every listed medication produced a view.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.faults.is_empty()
    }
}

/// Composes schedules and ledger snapshots into per-request views.
pub struct MedicationStatusAggregator<'a, M: ScheduleStore, S: IntakeStore> {
    schedules: &'a M,
    ledger: &'a IntakeLedger<S>,
    config: AdherenceConfig,
}

impl<'a, M: ScheduleStore, S: IntakeStore> MedicationStatusAggregator<'a, M, S> {
    pub fn new(schedules: &'a M, ledger: &'a IntakeLedger<S>, config: AdherenceConfig) -> Self {
        Self {
            schedules,
            ledger,
            config,
        }
    }

    /// Builds the status report for every medication of `user_id`.
    ///
    /// # Errors
    /// - Returns an error only when the medication list itself cannot be
    ///   read. Per-medication problems land in the report.
    pub fn statuses_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        caller_zone: Tz,
        order: StatusOrder,
    ) -> RepoResult<StatusReport> {
        let medications = match self.schedules.list_medications(user_id) {
            Ok(medications) => medications,
            Err(err) => {
                error!(
                    "event=status_list module=aggregator status=error user_id={user_id} error={err}"
                );
                return Err(err);
            }
        };

        let mut report = StatusReport::default();
        for medication in &medications {
            match self.status_for(medication, now, caller_zone) {
                Ok(view) => report.views.push(view),
                Err(StatusEntryError::Inconsistent(issue)) => {
                    warn!(
                        "event=status_skip module=aggregator status=inconsistent medication_id={} reason={issue}",
                        medication.medication_id
                    );
                    report.skipped.push(SkippedMedication {
                        medication_id: medication.medication_id,
                        issue,
                    });
                }
                Err(StatusEntryError::Storage(err)) => {
                    error!(
                        "event=status_fault module=aggregator status=error medication_id={} retryable={} error={err}",
                        medication.medication_id,
                        err.is_retryable()
                    );
                    report.faults.push(MedicationFault {
                        medication_id: medication.medication_id,
                        error: err,
                    });
                }
            }
        }

        if order == StatusOrder::Urgency {
            // Stable: ties keep input order.
            report
                .views
                .sort_by_key(|view| (view.state, view.next_due_at));
        }

        info!(
            "event=status_list module=aggregator status=ok user_id={user_id} total={} views={} skipped={} faults={}",
            medications.len(),
            report.views.len(),
            report.skipped.len(),
            report.faults.len()
        );
        Ok(report)
    }

    /// Derives the view of one medication.
    pub fn status_for(
        &self,
        medication: &Medication,
        now: DateTime<Utc>,
        caller_zone: Tz,
    ) -> Result<AdherenceView, StatusEntryError> {
        let record = match self.schedules.get_schedule(medication.medication_id) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(StatusEntryError::Inconsistent(ScheduleIssue::Missing)),
            Err(RepoError::InvalidData(detail)) => {
                return Err(StatusEntryError::Inconsistent(ScheduleIssue::Unreadable(
                    detail,
                )))
            }
            Err(err) => return Err(StatusEntryError::Storage(err)),
        };
        let definition = record
            .resolve()
            .map_err(|err| StatusEntryError::Inconsistent(ScheduleIssue::Malformed(err)))?;
        let latest = self.ledger.latest(medication.medication_id)?;

        Ok(derive_view(
            medication,
            &definition,
            latest.as_ref(),
            now,
            caller_zone,
            &self.config,
        ))
    }
}
