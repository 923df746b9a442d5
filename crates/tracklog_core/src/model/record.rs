//! Generic tracked record and its per-kind specializations.
//!
//! # Responsibility
//! - Define `Record` (read model) and `NewRecord` (write model).
//! - Define the enumerated `Difficulty` and the `Magnitude` carried by each
//!   record kind.
//!
//! # Invariants
//! - `NewRecord::validate()` must pass before a store appends the record.
//! - Persisted records may still carry malformed dates or magnitudes (hand
//!   edited files); readers keep them instead of failing.

use crate::model::date::is_canonical_day;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identifier. Monotonic and never reused.
pub type RecordId = i64;

/// Which tracker a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Solved practice problem.
    Problem,
    /// Expense line item.
    Expense,
}

/// External field names used by one record kind.
///
/// The generic record keeps one shape; callers see the names their tracker
/// has always used (`topic`, `difficulty`, `title` vs `category`, `amount`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNames {
    pub date: &'static str,
    pub category: &'static str,
    /// `None` when the kind has no subcategory.
    pub subcategory: Option<&'static str>,
    pub magnitude: &'static str,
    pub note: &'static str,
}

const PROBLEM_FIELDS: FieldNames = FieldNames {
    date: "date",
    category: "topic",
    subcategory: None,
    magnitude: "difficulty",
    note: "title",
};

const EXPENSE_FIELDS: FieldNames = FieldNames {
    date: "date",
    category: "category",
    subcategory: Some("subcategory"),
    magnitude: "amount",
    note: "note",
};

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Problem, RecordKind::Expense];

    /// Storage label (`problem|expense`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Problem => "problem",
            Self::Expense => "expense",
        }
    }

    /// Parses a storage label; accepts plural forms used by the JSON file.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "problem" | "problems" => Some(Self::Problem),
            "expense" | "expenses" => Some(Self::Expense),
            _ => None,
        }
    }

    pub fn fields(self) -> &'static FieldNames {
        match self {
            Self::Problem => &PROBLEM_FIELDS,
            Self::Expense => &EXPENSE_FIELDS,
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Problem difficulty buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }

    /// Case-insensitive parse of `easy|medium|hard`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary measured attribute of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Magnitude {
    /// Bounded enum used by the problem log.
    Difficulty(Difficulty),
    /// Continuous monetary amount used by the expense tracker.
    Amount(f64),
    /// Raw persisted value that matches neither shape.
    Unrecognized(String),
}

impl Magnitude {
    pub fn difficulty(&self) -> Option<Difficulty> {
        match self {
            Self::Difficulty(value) => Some(*value),
            _ => None,
        }
    }

    /// Finite numeric amount, if any.
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Amount(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }
}

/// Persisted record as read back from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub kind: RecordKind,
    /// Canonical `YYYY-MM-DD`, unless the backing data was edited by hand.
    pub occurred_on: String,
    pub category: String,
    /// Empty string when absent.
    pub subcategory: String,
    /// `None` when the persisted value was missing entirely.
    pub magnitude: Option<Magnitude>,
    /// Problem title or expense note.
    pub note: String,
}

/// Write model for the append path. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub occurred_on: String,
    pub category: String,
    pub subcategory: String,
    pub magnitude: Magnitude,
    pub note: String,
}

impl NewRecord {
    /// Problem draft. Fields are stored as given; call `validate()` first.
    pub fn problem(
        occurred_on: impl Into<String>,
        topic: impl Into<String>,
        difficulty: Difficulty,
        title: impl Into<String>,
    ) -> Self {
        Self {
            kind: RecordKind::Problem,
            occurred_on: occurred_on.into(),
            category: topic.into(),
            subcategory: String::new(),
            magnitude: Magnitude::Difficulty(difficulty),
            note: title.into(),
        }
    }

    /// Expense draft. Fields are stored as given; call `validate()` first.
    pub fn expense(
        occurred_on: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        subcategory: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            kind: RecordKind::Expense,
            occurred_on: occurred_on.into(),
            category: category.into(),
            subcategory: subcategory.into(),
            magnitude: Magnitude::Amount(amount),
            note: note.into(),
        }
    }

    /// Checks the append-time invariants.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if !is_canonical_day(&self.occurred_on) {
            return Err(RecordValidationError::MalformedDate(
                self.occurred_on.clone(),
            ));
        }
        if self.category.trim().is_empty() {
            return Err(RecordValidationError::EmptyCategory);
        }

        match (self.kind, &self.magnitude) {
            (RecordKind::Problem, Magnitude::Difficulty(_)) => {
                if self.note.trim().is_empty() {
                    return Err(RecordValidationError::EmptyTitle);
                }
            }
            (RecordKind::Expense, Magnitude::Amount(amount)) => {
                if !amount.is_finite() || *amount < 0.0 {
                    return Err(RecordValidationError::InvalidAmount(*amount));
                }
            }
            (kind, _) => return Err(RecordValidationError::MagnitudeMismatch(kind)),
        }

        Ok(())
    }

    /// Materializes the read model once the store has assigned an id.
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            kind: self.kind,
            occurred_on: self.occurred_on,
            category: self.category,
            subcategory: self.subcategory,
            magnitude: Some(self.magnitude),
            note: self.note,
        }
    }
}

/// Validation failures for the append path.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValidationError {
    MalformedDate(String),
    EmptyCategory,
    EmptyTitle,
    InvalidAmount(f64),
    MagnitudeMismatch(RecordKind),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedDate(value) => {
                write!(f, "date `{value}` is not a valid YYYY-MM-DD day")
            }
            Self::EmptyCategory => write!(f, "category must not be empty"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::InvalidAmount(value) => {
                write!(f, "amount must be a non-negative number, got {value}")
            }
            Self::MagnitudeMismatch(kind) => {
                write!(f, "magnitude does not match record kind `{kind}`")
            }
        }
    }
}

impl Error for RecordValidationError {}
