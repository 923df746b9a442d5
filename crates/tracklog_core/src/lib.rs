//! Core domain logic for tracklog.
//! This crate is the single source of truth for record invariants and the
//! analytics over them.

pub mod analytics;
pub mod catalog;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use analytics::{GroupTotal, MatchMode, Summary};
pub use catalog::{default_categories, load_categories};
pub use logging::{default_log_level, init_logging, logging_status, LogSink};
pub use model::record::{
    Difficulty, Magnitude, NewRecord, Record, RecordId, RecordKind, RecordValidationError,
};
pub use service::tracker_service::{
    AddExpenseRequest, AddProblemRequest, ExpenseQuery, ExpenseSummary, ServiceError,
    ServiceResult, TrackerService,
};
pub use store::{
    GroupQuery, JsonFileStore, RecordStore, SqliteRecordStore, StoreError, StoreResult, TopicNote,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
