//! Medication adherence scheduling core.
//!
//! Turns a medication's cadence plus its intake history into a current
//! status, and owns the intake ledger with its undo contract.

pub mod adherence;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use adherence::due::{evaluate_due, is_due_now, next_due, recently_taken, DueStatus};
pub use adherence::label::format_next_label;
pub use adherence::view::{derive_view, AdherenceState, AdherenceView};
pub use config::{AdherenceConfig, AdherenceSettings, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::intake::{IntakeId, IntakeRecord};
pub use model::medication::{Medication, MedicationId, UserId};
pub use model::schedule::{
    Schedule, ScheduleDefinition, ScheduleError, ScheduleRecord, TimeOfDay,
};
pub use repo::intake_repo::{IntakeStore, SqliteIntakeStore};
pub use repo::medication_repo::{ScheduleStore, SqliteMedicationStore};
pub use repo::memory_store::MemoryIntakeStore;
pub use repo::{RepoError, RepoResult};
pub use service::adherence_service::{
    AdherenceError, AdherenceResult, AdherenceService, UndoOutcome, ValidationError,
};
pub use service::intake_ledger::IntakeLedger;
pub use service::status_aggregator::{
    MedicationFault, MedicationStatusAggregator, ScheduleIssue, SkippedMedication,
    StatusEntryError, StatusOrder, StatusReport,
};

/// Health-check probe for host wiring.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
