//! Adherence scheduling core.
//!
//! # Responsibility
//! - Turn a schedule plus the latest intake into a due status.
//! - Derive display state and labels from that status.
//!
//! # Invariants
//! - Everything here is pure; `now` and the zone are always inputs.
//! - Nothing in this module reads storage or holds state.

pub mod due;
pub mod label;
pub mod view;
