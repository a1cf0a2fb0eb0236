//! Domain model for medication cadence and intake history.
//!
//! # Responsibility
//! - Define canonical data shapes shared by calculator, ledger and services.
//! - Validate schedule inputs at construction time.
//!
//! # Invariants
//! - Every medication and intake is identified by a stable UUID.
//! - Intake records are immutable once created.

pub mod intake;
pub mod medication;
pub mod schedule;
