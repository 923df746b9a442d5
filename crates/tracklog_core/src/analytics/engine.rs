//! Filtering, ordering and aggregate statistics over fetched records.
//!
//! # Responsibility
//! - Turn a record sequence already read from a store into list views and
//!   summaries.
//!
//! # Invariants
//! - Every function is pure: input is borrowed, output is freshly allocated.
//! - Nothing here fails. Malformed records are dropped from the aggregate
//!   they cannot contribute to and still count where counting is meaningful.
//! - List ordering is `occurred_on DESC, id DESC`.

use crate::model::date::is_canonical_day;
use crate::model::record::{Difficulty, Record};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How a category filter compares against `Record::category`.
///
/// Both modes ignore case. Listing is forgiving (`"arr"` finds `"Arrays"`),
/// stats are not (`"Arrays"` must not pull in `"Array Tricks"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Substring,
    Exact,
}

/// Fixed-shape summary of a record sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub today_count: usize,
    /// Always holds every `Difficulty` bucket, zero when unseen.
    pub breakdown: BTreeMap<Difficulty, usize>,
    pub avg_per_day: f64,
}

/// One group produced by `summarize_grouped`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub sum: f64,
    pub count: usize,
}

/// Returns whether `record` passes the optional category filter.
///
/// A missing or whitespace-only filter passes everything.
pub fn category_matches(record: &Record, filter: Option<&str>, mode: MatchMode) -> bool {
    category_label_matches(&record.category, filter, mode)
}

/// Same comparison as `category_matches`, over a bare label.
pub fn category_label_matches(category: &str, filter: Option<&str>, mode: MatchMode) -> bool {
    let Some(needle) = normalized_filter(filter) else {
        return true;
    };
    let haystack = category.to_lowercase();
    match mode {
        MatchMode::Substring => haystack.contains(&needle),
        MatchMode::Exact => haystack == needle,
    }
}

/// Filters by category and orders newest first.
pub fn filter_and_sort(records: &[Record], filter: Option<&str>, mode: MatchMode) -> Vec<Record> {
    let mut kept: Vec<Record> = records
        .iter()
        .filter(|record| category_matches(record, filter, mode))
        .cloned()
        .collect();
    kept.sort_by(newest_first);
    kept
}

/// Keeps records whose day falls inside the inclusive `[start, end]` range.
///
/// With no bounds every record is kept, malformed days included. Once any
/// bound is set, records without a canonical day are dropped.
pub fn filter_by_date_range(
    records: &[Record],
    start: Option<&str>,
    end: Option<&str>,
) -> Vec<Record> {
    let start = start.map(str::trim).filter(|value| !value.is_empty());
    let end = end.map(str::trim).filter(|value| !value.is_empty());
    if start.is_none() && end.is_none() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| {
            is_canonical_day(&record.occurred_on)
                && start.map_or(true, |start| record.occurred_on.as_str() >= start)
                && end.map_or(true, |end| record.occurred_on.as_str() <= end)
        })
        .cloned()
        .collect()
}

/// Counts, per-difficulty breakdown and average records per active day.
pub fn summarize(records: &[Record], today: &str) -> Summary {
    let mut breakdown: BTreeMap<Difficulty, usize> =
        Difficulty::ALL.iter().map(|bucket| (*bucket, 0)).collect();
    let mut days: BTreeSet<&str> = BTreeSet::new();
    let mut today_count = 0;

    for record in records {
        if record.occurred_on == today {
            today_count += 1;
        }
        if is_canonical_day(&record.occurred_on) {
            days.insert(record.occurred_on.as_str());
        }
        if let Some(bucket) = record.magnitude.as_ref().and_then(|m| m.difficulty()) {
            *breakdown.entry(bucket).or_insert(0) += 1;
        }
    }

    let total = records.len();
    let divisor = days.len().max(1);
    Summary {
        total,
        today_count,
        breakdown,
        avg_per_day: round2(total as f64 / divisor as f64),
    }
}

/// Sums numeric magnitudes per key, largest sum first.
///
/// Records without a finite amount are skipped entirely. Ties on `sum`
/// order by ascending key.
pub fn summarize_grouped<F>(records: &[Record], key_fn: F) -> Vec<GroupTotal>
where
    F: Fn(&Record) -> String,
{
    let mut groups: HashMap<String, (f64, usize)> = HashMap::new();
    for record in records {
        let Some(amount) = record.magnitude.as_ref().and_then(|m| m.amount()) else {
            continue;
        };
        let entry = groups.entry(key_fn(record)).or_insert((0.0, 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    let mut totals: Vec<GroupTotal> = groups
        .into_iter()
        .map(|(key, (sum, count))| GroupTotal { key, sum, count })
        .collect();
    sort_group_totals(&mut totals);
    totals
}

/// Orders groups by `sum DESC, key ASC`.
pub fn sort_group_totals(totals: &mut [GroupTotal]) {
    totals.sort_by(|left, right| {
        right
            .sum
            .total_cmp(&left.sum)
            .then_with(|| left.key.cmp(&right.key))
    });
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn newest_first(left: &Record, right: &Record) -> Ordering {
    right
        .occurred_on
        .cmp(&left.occurred_on)
        .then_with(|| right.id.cmp(&left.id))
}

fn normalized_filter(filter: Option<&str>) -> Option<String> {
    let trimmed = filter?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        filter_and_sort, filter_by_date_range, round2, summarize, summarize_grouped, MatchMode,
    };
    use crate::model::record::{Difficulty, Magnitude, Record, RecordKind};

    fn problem(id: i64, day: &str, topic: &str, difficulty: Option<Magnitude>) -> Record {
        Record {
            id,
            kind: RecordKind::Problem,
            occurred_on: day.to_string(),
            category: topic.to_string(),
            subcategory: String::new(),
            magnitude: difficulty,
            note: format!("problem {id}"),
        }
    }

    fn expense(id: i64, category: &str, amount: Option<Magnitude>) -> Record {
        Record {
            id,
            kind: RecordKind::Expense,
            occurred_on: "2024-03-01".to_string(),
            category: category.to_string(),
            subcategory: String::new(),
            magnitude: amount,
            note: String::new(),
        }
    }

    fn level(difficulty: Difficulty) -> Option<Magnitude> {
        Some(Magnitude::Difficulty(difficulty))
    }

    fn sample() -> Vec<Record> {
        vec![
            problem(1, "2024-01-01", "Arrays", level(Difficulty::Easy)),
            problem(2, "2024-01-01", "Graphs", level(Difficulty::Hard)),
            problem(3, "2024-01-02", "Arrays", level(Difficulty::Medium)),
        ]
    }

    #[test]
    fn summarize_reference_scenario() {
        let summary = summarize(&sample(), "2024-01-02");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.today_count, 1);
        assert_eq!(summary.breakdown[&Difficulty::Easy], 1);
        assert_eq!(summary.breakdown[&Difficulty::Medium], 1);
        assert_eq!(summary.breakdown[&Difficulty::Hard], 1);
        assert_eq!(summary.avg_per_day, 1.5);
    }

    #[test]
    fn summarize_empty_input_is_all_zero() {
        let summary = summarize(&[], "2024-01-02");
        assert_eq!(summary.total, 0);
        assert_eq!(summary.today_count, 0);
        assert_eq!(summary.avg_per_day, 0.0);
        assert_eq!(summary.breakdown.len(), 3);
        assert!(summary.breakdown.values().all(|count| *count == 0));
    }

    #[test]
    fn unrecognized_magnitude_counts_in_total_only() {
        let mut records = sample();
        records.push(problem(
            4,
            "2024-01-02",
            "Arrays",
            Some(Magnitude::Unrecognized("Insane".to_string())),
        ));
        records.push(problem(5, "2024-01-02", "Arrays", None));

        let summary = summarize(&records, "2024-01-02");
        assert_eq!(summary.total, 5);
        assert_eq!(summary.breakdown.values().sum::<usize>(), 3);
        assert_eq!(summary.breakdown.len(), 3);
    }

    #[test]
    fn malformed_days_are_skipped_for_averages_but_listed() {
        let records = vec![
            problem(1, "2024-01-01", "Arrays", level(Difficulty::Easy)),
            problem(2, "someday", "Arrays", level(Difficulty::Easy)),
        ];

        let summary = summarize(&records, "2024-01-01");
        assert_eq!(summary.avg_per_day, 2.0);

        let listed = filter_and_sort(&records, None, MatchMode::Substring);
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn list_and_stats_modes_disagree_on_partial_names() {
        let records = sample();
        let listed = filter_and_sort(&records, Some("rr"), MatchMode::Substring);
        assert_eq!(listed.len(), 2);

        let exact = filter_and_sort(&records, Some("rr"), MatchMode::Exact);
        assert!(exact.is_empty());

        let exact = filter_and_sort(&records, Some("ARRAYS"), MatchMode::Exact);
        assert_eq!(exact.len(), 2);
    }

    #[test]
    fn exact_mode_does_not_pull_in_longer_names() {
        let mut records = sample();
        records.push(problem(4, "2024-01-03", "Array Tricks", level(Difficulty::Easy)));
        let exact = filter_and_sort(&records, Some("array tricks"), MatchMode::Exact);
        assert_eq!(exact.len(), 1);
        let exact = filter_and_sort(&records, Some("Arrays"), MatchMode::Exact);
        assert!(exact.iter().all(|record| record.category == "Arrays"));
    }

    #[test]
    fn blank_filter_means_no_filter() {
        let records = sample();
        assert_eq!(
            filter_and_sort(&records, Some("   "), MatchMode::Exact).len(),
            records.len()
        );
    }

    #[test]
    fn ordering_is_newest_day_then_newest_id_and_stable() {
        let records = sample();
        let first = filter_and_sort(&records, None, MatchMode::Substring);
        let ids: Vec<i64> = first.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let second = filter_and_sort(&records, None, MatchMode::Substring);
        assert_eq!(first, second);
        assert_eq!(records[0].id, 1, "input must not be reordered");
    }

    #[test]
    fn filtered_summary_never_exceeds_unfiltered() {
        let records = sample();
        let all = summarize(&records, "2024-01-01");
        let arrays = filter_and_sort(&records, Some("arrays"), MatchMode::Exact);
        let some = summarize(&arrays, "2024-01-01");
        assert!(some.total <= all.total);
        assert!(some.today_count <= all.today_count);
        for (bucket, count) in &some.breakdown {
            assert!(*count <= all.breakdown[bucket]);
        }
    }

    #[test]
    fn grouped_sums_order_by_descending_sum() {
        let records = vec![
            expense(1, "Food", Some(Magnitude::Amount(10.0))),
            expense(2, "Food", Some(Magnitude::Amount(5.0))),
            expense(3, "Travel", Some(Magnitude::Amount(20.0))),
        ];
        let totals = summarize_grouped(&records, |record| record.category.clone());
        let flat: Vec<(&str, f64, usize)> = totals
            .iter()
            .map(|group| (group.key.as_str(), group.sum, group.count))
            .collect();
        assert_eq!(flat, vec![("Travel", 20.0, 1), ("Food", 15.0, 2)]);
    }

    #[test]
    fn grouped_ties_break_on_key_and_skip_non_numeric() {
        let records = vec![
            expense(1, "Rent", Some(Magnitude::Amount(7.0))),
            expense(2, "Books", Some(Magnitude::Amount(7.0))),
            expense(3, "Books", Some(Magnitude::Unrecognized("abc".to_string()))),
            expense(4, "Gifts", None),
        ];
        let totals = summarize_grouped(&records, |record| record.category.clone());
        let keys: Vec<&str> = totals.iter().map(|group| group.key.as_str()).collect();
        assert_eq!(keys, vec!["Books", "Rent"]);
        assert_eq!(totals[0].count, 1);
    }

    #[test]
    fn date_range_is_inclusive_and_drops_malformed_days() {
        let records = vec![
            problem(1, "2024-01-01", "Arrays", None),
            problem(2, "2024-01-05", "Arrays", None),
            problem(3, "2024-01-09", "Arrays", None),
            problem(4, "n/a", "Arrays", None),
        ];
        let ranged = filter_by_date_range(&records, Some("2024-01-01"), Some("2024-01-05"));
        let ids: Vec<i64> = ranged.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(filter_by_date_range(&records, None, Some(" ")).len(), 4);
        assert_eq!(filter_by_date_range(&records, Some("2024-01-06"), None).len(), 1);
    }

    #[test]
    fn round2_rounds_to_cents() {
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(0.0), 0.0);
    }
}
