//! Tracker use-case service.
//!
//! # Responsibility
//! - Validate caller input for add/list/stats/note use-cases.
//! - Fetch records from a `RecordStore` and hand them to the analytics
//!   engine.
//!
//! # Invariants
//! - Service APIs never bypass store validation/persistence contracts.
//! - Service layer remains storage-agnostic.
//! - Lists use substring category matching, stats use exact matching.

use crate::analytics::{
    filter_and_sort, filter_by_date_range, round2, summarize, GroupTotal, MatchMode, Summary,
};
use crate::model::date::{is_canonical_day, today};
use crate::model::record::{Difficulty, NewRecord, Record, RecordKind};
use crate::store::{GroupQuery, RecordStore, StoreError, TopicNote};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for tracker use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input failed validation before reaching the store.
    InvalidInput(String),
    /// No note saved for the requested topic.
    NoteNotFound(String),
    /// Persistence-layer failure.
    Store(StoreError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NoteNotFound(topic) => write!(f, "no note saved for topic `{topic}`"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent store state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => Self::InvalidInput(err.to_string()),
            other => Self::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Request model for logging one solved problem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddProblemRequest {
    pub topic: String,
    /// `easy|medium|hard`, any case.
    pub difficulty: String,
    pub title: String,
    /// Defaults to today when `None` or blank.
    pub date: Option<String>,
}

/// Request model for logging one expense.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddExpenseRequest {
    pub amount: f64,
    pub category: String,
    pub subcategory: Option<String>,
    pub note: Option<String>,
    /// Defaults to today when `None` or blank.
    pub date: Option<String>,
}

/// Date window plus optional category for expense queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
}

/// Per-category spending totals for a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSummary {
    /// Sum over all groups, rounded to cents.
    pub total_amount: f64,
    /// Number of summed expense lines.
    pub count: usize,
    /// Largest spend first.
    pub groups: Vec<GroupTotal>,
}

/// Tracker service facade over a record store.
pub struct TrackerService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> TrackerService<S> {
    /// Creates a service using the provided store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates and appends one solved problem.
    pub fn add_problem(&mut self, request: &AddProblemRequest) -> ServiceResult<Record> {
        let difficulty = Difficulty::parse(&request.difficulty).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "difficulty must be one of Easy|Medium|Hard, got `{}`",
                request.difficulty.trim()
            ))
        })?;
        let record = NewRecord::problem(
            resolve_day(request.date.as_deref())?,
            request.topic.trim(),
            difficulty,
            request.title.trim(),
        );
        self.append(record)
    }

    /// Validates and appends one expense line.
    pub fn add_expense(&mut self, request: &AddExpenseRequest) -> ServiceResult<Record> {
        let record = NewRecord::expense(
            resolve_day(request.date.as_deref())?,
            request.amount,
            request.category.trim(),
            request.subcategory.as_deref().unwrap_or_default().trim(),
            request.note.as_deref().unwrap_or_default().trim(),
        );
        self.append(record)
    }

    /// Lists problems newest first, optionally by topic substring.
    pub fn list_problems(&self, topic: Option<&str>) -> ServiceResult<Vec<Record>> {
        let records = self.store.scan(RecordKind::Problem)?;
        Ok(filter_and_sort(&records, topic, MatchMode::Substring))
    }

    /// Lists expenses in the window newest first, optionally by category
    /// substring.
    pub fn list_expenses(&self, query: &ExpenseQuery) -> ServiceResult<Vec<Record>> {
        let (start, end) = resolve_window(query)?;
        let records = self.store.scan(RecordKind::Expense)?;
        let windowed = filter_by_date_range(&records, start.as_deref(), end.as_deref());
        Ok(filter_and_sort(
            &windowed,
            query.category.as_deref(),
            MatchMode::Substring,
        ))
    }

    /// Problem statistics, optionally for one exact topic.
    ///
    /// `today` defaults to the local date.
    pub fn problem_stats(
        &self,
        topic: Option<&str>,
        today_override: Option<&str>,
    ) -> ServiceResult<Summary> {
        let reference_day = resolve_day(today_override)?;
        let records = self.store.scan(RecordKind::Problem)?;
        let selected = filter_and_sort(&records, topic, MatchMode::Exact);
        Ok(summarize(&selected, &reference_day))
    }

    /// Spending per category inside the window.
    pub fn expense_summary(&self, query: &ExpenseQuery) -> ServiceResult<ExpenseSummary> {
        let (start, end) = resolve_window(query)?;
        let groups = self.store.grouped_totals(
            RecordKind::Expense,
            &GroupQuery {
                start,
                end,
                category: query.category.clone(),
            },
        )?;

        let total: f64 = groups.iter().map(|group| group.sum).sum();
        let count = groups.iter().map(|group| group.count).sum();
        Ok(ExpenseSummary {
            total_amount: round2(total),
            count,
            groups,
        })
    }

    /// Number of problems logged so far.
    pub fn total_solved(&self) -> ServiceResult<usize> {
        Ok(self.store.scan(RecordKind::Problem)?.len())
    }

    /// Saves (or overwrites) the note for `topic` and reads it back.
    pub fn save_note(&mut self, topic: &str, content: &str) -> ServiceResult<TopicNote> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ServiceError::InvalidInput(
                "topic must not be empty".to_string(),
            ));
        }

        self.store.upsert_note(topic, content)?;
        self.store
            .get_note(topic)?
            .ok_or(ServiceError::InconsistentState(
                "saved note not found in read-back",
            ))
    }

    /// Gets the note for the exact (trimmed) `topic`.
    pub fn get_note(&self, topic: &str) -> ServiceResult<TopicNote> {
        let topic = topic.trim();
        self.store
            .get_note(topic)?
            .ok_or_else(|| ServiceError::NoteNotFound(topic.to_string()))
    }

    fn append(&mut self, record: NewRecord) -> ServiceResult<Record> {
        let id = self.store.insert(&record)?;
        Ok(record.into_record(id))
    }
}

/// Resolves an optional caller day, defaulting to today.
pub fn resolve_day(value: Option<&str>) -> ServiceResult<String> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(today()),
        Some(day) if is_canonical_day(day) => Ok(day.to_string()),
        Some(day) => Err(ServiceError::InvalidInput(format!(
            "date `{day}` must be a valid YYYY-MM-DD day"
        ))),
    }
}

fn resolve_window(query: &ExpenseQuery) -> ServiceResult<(Option<String>, Option<String>)> {
    let bound = |value: Option<&str>, name: &str| -> ServiceResult<Option<String>> {
        match value.map(str::trim).filter(|value| !value.is_empty()) {
            None => Ok(None),
            Some(day) if is_canonical_day(day) => Ok(Some(day.to_string())),
            Some(day) => Err(ServiceError::InvalidInput(format!(
                "{name} `{day}` must be a valid YYYY-MM-DD day"
            ))),
        }
    };
    Ok((
        bound(query.start_date.as_deref(), "start_date")?,
        bound(query.end_date.as_deref(), "end_date")?,
    ))
}
