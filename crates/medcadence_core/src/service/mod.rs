//! Use-case services.
//!
//! # Responsibility
//! - Wrap storage contracts into the ledger, aggregation and inbound
//!   read/write entry points.
//! - Keep host transports decoupled from storage details.

pub mod adherence_service;
pub mod intake_ledger;
pub mod status_aggregator;
