//! Static category catalog.
//!
//! # Responsibility
//! - Offer the reference list of category labels per record kind.
//! - Prefer a side file when one is configured, fall back to built-in lists.
//!
//! # Invariants
//! - Loading never fails; a broken side file is logged and ignored.
//! - Returned labels are trimmed, non-empty and deduplicated in first-seen
//!   order.

use crate::model::record::RecordKind;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const DEFAULT_PROBLEM_TOPICS: &[&str] = &[
    "Arrays",
    "Strings",
    "Hashing",
    "Two Pointers",
    "Sliding Window",
    "Linked List",
    "Stack",
    "Queue",
    "Binary Search",
    "Trees",
    "Binary Search Tree",
    "Heap",
    "Graphs",
    "Backtracking",
    "Dynamic Programming",
    "Greedy",
    "Trie",
    "Bit Manipulation",
    "Math",
];

const DEFAULT_EXPENSE_CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Housing",
    "Utilities",
    "Health",
    "Education",
    "Entertainment",
    "Shopping",
    "Travel",
    "Subscriptions",
    "Gifts",
    "Other",
];

/// Accepted side-file shapes.
///
/// Either a plain label list, or labels mapped to their subcategories (only
/// the labels are surfaced). A top-level object may also nest either shape
/// under the record kind (`{"problem": [...], "expense": {...}}`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Labels(Vec<String>),
    WithSubcategories(BTreeMap<String, Vec<String>>),
    PerKind(BTreeMap<String, CatalogFile>),
}

/// Built-in labels for `kind`.
pub fn default_categories(kind: RecordKind) -> Vec<String> {
    let labels = match kind {
        RecordKind::Problem => DEFAULT_PROBLEM_TOPICS,
        RecordKind::Expense => DEFAULT_EXPENSE_CATEGORIES,
    };
    labels.iter().map(|label| (*label).to_string()).collect()
}

/// Loads category labels for `kind` from `side_file`, else defaults.
pub fn load_categories(kind: RecordKind, side_file: Option<&Path>) -> Vec<String> {
    let Some(path) = side_file else {
        return default_categories(kind);
    };
    if !path.exists() {
        debug!(
            "event=catalog_load module=catalog status=fallback reason=missing path={}",
            path.display()
        );
        return default_categories(kind);
    }

    match read_catalog(path).map(|file| labels_for(file, kind)) {
        Ok(Some(labels)) if !labels.is_empty() => labels,
        Ok(_) => {
            warn!(
                "event=catalog_load module=catalog status=fallback reason=no_labels kind={} path={}",
                kind,
                path.display()
            );
            default_categories(kind)
        }
        Err(err) => {
            warn!(
                "event=catalog_load module=catalog status=fallback reason=invalid path={} error={}",
                path.display(),
                err
            );
            default_categories(kind)
        }
    }
}

fn read_catalog(path: &Path) -> Result<CatalogFile, String> {
    let raw = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&raw).map_err(|err| err.to_string())
}

fn labels_for(file: CatalogFile, kind: RecordKind) -> Option<Vec<String>> {
    match file {
        CatalogFile::Labels(labels) => Some(normalize_labels(labels)),
        // `{"problems": [...], "expenses": [...]}` also decodes as this shape.
        CatalogFile::WithSubcategories(map)
            if !map.is_empty() && map.keys().all(|key| RecordKind::parse(key).is_some()) =>
        {
            map.into_iter()
                .find(|(key, _)| RecordKind::parse(key) == Some(kind))
                .map(|(_, labels)| normalize_labels(labels))
        }
        CatalogFile::WithSubcategories(map) => Some(normalize_labels(map.into_keys().collect())),
        CatalogFile::PerKind(map) => map
            .into_iter()
            .find(|(key, _)| RecordKind::parse(key) == Some(kind))
            .and_then(|(_, nested)| match nested {
                CatalogFile::PerKind(_) => None,
                flat => labels_for(flat, kind),
            }),
    }
}

fn normalize_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty() && seen.insert(label.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{default_categories, load_categories};
    use crate::model::record::RecordKind;
    use std::path::Path;

    #[test]
    fn missing_side_file_uses_defaults() {
        let labels = load_categories(
            RecordKind::Expense,
            Some(Path::new("/definitely/not/here/categories.json")),
        );
        assert_eq!(labels, default_categories(RecordKind::Expense));
    }

    #[test]
    fn label_list_is_trimmed_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, r#"[" Food ", "food", "Rent", ""]"#).unwrap();

        let labels = load_categories(RecordKind::Expense, Some(&path));
        assert_eq!(labels, vec!["Food".to_string(), "Rent".to_string()]);
    }

    #[test]
    fn subcategory_map_surfaces_labels_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, r#"{"Food": ["groceries", "dining"], "Bills": []}"#).unwrap();

        let labels = load_categories(RecordKind::Expense, Some(&path));
        assert_eq!(labels, vec!["Bills".to_string(), "Food".to_string()]);
    }

    #[test]
    fn per_kind_file_picks_matching_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(
            &path,
            r#"{"problems": ["Graphs"], "expenses": {"Food": ["snacks"]}}"#,
        )
        .unwrap();

        assert_eq!(
            load_categories(RecordKind::Problem, Some(&path)),
            vec!["Graphs".to_string()]
        );
        assert_eq!(
            load_categories(RecordKind::Expense, Some(&path)),
            vec!["Food".to_string()]
        );
    }

    #[test]
    fn per_kind_label_lists_are_not_mistaken_for_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, r#"{"problems": ["Trees"], "expenses": ["Rent"]}"#).unwrap();

        assert_eq!(
            load_categories(RecordKind::Problem, Some(&path)),
            vec!["Trees".to_string()]
        );
        assert_eq!(
            load_categories(RecordKind::Expense, Some(&path)),
            vec!["Rent".to_string()]
        );
    }

    #[test]
    fn invalid_side_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(
            load_categories(RecordKind::Problem, Some(&path)),
            default_categories(RecordKind::Problem)
        );
    }
}
