//! Record store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the narrow persistence surface the services depend on: append,
//!   scan, grouped aggregate and the topic-note upsert.
//! - Keep file and SQL details out of the analytics engine.
//!
//! # Invariants
//! - Write paths must call `NewRecord::validate()` before persisting.
//! - Ids are assigned by the store, strictly increasing, never reused.
//! - Scans return records in insertion (id) order; ordering for display is
//!   the analytics engine's job.

use crate::analytics::{
    category_label_matches, filter_by_date_range, summarize_grouped, GroupTotal, MatchMode,
};
use crate::db::DbError;
use crate::model::record::{NewRecord, Record, RecordId, RecordKind, RecordValidationError};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod json_store;
pub mod sqlite_store;

pub use json_store::JsonFileStore;
pub use sqlite_store::SqliteRecordStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-layer error for record and note persistence.
#[derive(Debug)]
pub enum StoreError {
    Validation(RecordValidationError),
    Db(DbError),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "store file error: {err}"),
            Self::Json(err) => write!(f, "store file is not valid JSON: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::UninitializedConnection { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<RecordValidationError> for StoreError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Free-text study note, one per exact topic string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicNote {
    pub topic: String,
    pub content: String,
    /// Epoch milliseconds of the last save.
    pub updated_at: i64,
}

/// Grouped-aggregate request: sum amounts per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupQuery {
    /// Inclusive lower day bound (`YYYY-MM-DD`).
    pub start: Option<String>,
    /// Inclusive upper day bound (`YYYY-MM-DD`).
    pub end: Option<String>,
    /// Exact, case-insensitive category filter.
    pub category: Option<String>,
}

/// Persistence interface for tracked records and topic notes.
pub trait RecordStore {
    /// Validates and appends one record, returning its new id.
    fn insert(&mut self, record: &NewRecord) -> StoreResult<RecordId>;

    /// Returns every record of `kind` in insertion order.
    fn scan(&self, kind: RecordKind) -> StoreResult<Vec<Record>>;

    /// Returns records of `kind` accepted by `predicate`, in insertion order.
    fn scan_where(
        &self,
        kind: RecordKind,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> StoreResult<Vec<Record>> {
        let mut records = self.scan(kind)?;
        records.retain(|record| predicate(record));
        Ok(records)
    }

    /// Sums numeric magnitudes of `kind` per category.
    ///
    /// Ordering follows `analytics::sort_group_totals`.
    fn grouped_totals(
        &self,
        kind: RecordKind,
        query: &GroupQuery,
    ) -> StoreResult<Vec<GroupTotal>> {
        let records = filter_by_date_range(
            &self.scan(kind)?,
            query.start.as_deref(),
            query.end.as_deref(),
        );
        let category = query.category.as_deref();
        let filtered: Vec<Record> = records
            .into_iter()
            .filter(|record| category_label_matches(&record.category, category, MatchMode::Exact))
            .collect();
        Ok(summarize_grouped(&filtered, |record| record.category.clone()))
    }

    /// Creates or overwrites the note for `topic`.
    fn upsert_note(&mut self, topic: &str, content: &str) -> StoreResult<()>;

    /// Gets the note for the exact `topic`, if any.
    fn get_note(&self, topic: &str) -> StoreResult<Option<TopicNote>>;
}

impl<S: RecordStore + ?Sized> RecordStore for &mut S {
    fn insert(&mut self, record: &NewRecord) -> StoreResult<RecordId> {
        (**self).insert(record)
    }

    fn scan(&self, kind: RecordKind) -> StoreResult<Vec<Record>> {
        (**self).scan(kind)
    }

    fn scan_where(
        &self,
        kind: RecordKind,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> StoreResult<Vec<Record>> {
        (**self).scan_where(kind, predicate)
    }

    fn grouped_totals(
        &self,
        kind: RecordKind,
        query: &GroupQuery,
    ) -> StoreResult<Vec<GroupTotal>> {
        (**self).grouped_totals(kind, query)
    }

    fn upsert_note(&mut self, topic: &str, content: &str) -> StoreResult<()> {
        (**self).upsert_note(topic, content)
    }

    fn get_note(&self, topic: &str) -> StoreResult<Option<TopicNote>> {
        (**self).get_note(topic)
    }
}
