//! Tracked record domain model.
//!
//! # Responsibility
//! - Define the one generic record shape shared by the problem log and the
//!   expense tracker.
//! - Keep per-kind field naming in one place so list output and file layout
//!   agree.
//!
//! # Invariants
//! - Every record is identified by a store-assigned `RecordId`.
//! - Records are append-only; only topic notes are overwritten.

pub mod date;
pub mod record;
