//! Storage-agnostic analytics over tracked records.
//!
//! # Responsibility
//! - Produce filtered/sorted views and aggregate summaries from records a
//!   store has already returned.
//! - Stay free of I/O so callers can run it on in-memory fixtures.

pub mod engine;

pub use engine::{
    category_label_matches, category_matches, filter_and_sort, filter_by_date_range, round2,
    sort_group_totals, summarize, summarize_grouped, GroupTotal, MatchMode, Summary,
};
