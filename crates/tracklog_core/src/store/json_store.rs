//! Flat JSON file record store.
//!
//! # Responsibility
//! - Keep problems, expenses and topic notes in one human-editable document.
//! - Stay readable when the file was written by older tooling or by hand.
//!
//! # Invariants
//! - Every mutation is a full read-modify-write under an exclusive OS lock on
//!   `<document>.lock` (plus an in-process mutex), so concurrent writers in
//!   separate processes queue instead of overwriting each other.
//! - Writes land through a temp file persisted over the target, so readers
//!   never see a half-written document.
//! - `next_id` only grows; rows that arrive without an id get fresh ones on
//!   load, which are persisted by the next write.

use crate::model::record::{Difficulty, Magnitude, NewRecord, Record, RecordId, RecordKind};
use crate::store::{RecordStore, StoreError, StoreResult, TopicNote};
use chrono::Utc;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use fd_lock::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

static FILE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const LOCK_SUFFIX: &str = ".lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Shared,
    Exclusive,
}

/// Whole-file document layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct JsonDocument {
    #[serde(default)]
    next_id: RecordId,
    #[serde(default)]
    problems: Vec<ProblemRow>,
    #[serde(default)]
    expenses: Vec<ExpenseRow>,
    #[serde(default)]
    notes: BTreeMap<String, NoteEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProblemRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    #[serde(default)]
    date: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    difficulty: Option<Value>,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExpenseRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    #[serde(default)]
    date: String,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    category: String,
    #[serde(default)]
    subcategory: String,
    #[serde(default)]
    note: String,
}

/// Notes were once saved as bare strings; newer writes carry a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum NoteEntry {
    Stamped { content: String, updated_at: i64 },
    Plain(String),
}

impl JsonDocument {
    /// Hands out ids to rows that have none and repairs `next_id`.
    fn assign_missing_ids(&mut self) -> usize {
        let max_seen = self
            .problems
            .iter()
            .filter_map(|row| row.id)
            .chain(self.expenses.iter().filter_map(|row| row.id))
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(max_seen + 1).max(1);

        let mut assigned = 0;
        let ids = self
            .problems
            .iter_mut()
            .map(|row| &mut row.id)
            .chain(self.expenses.iter_mut().map(|row| &mut row.id));
        for id in ids {
            if id.is_none() {
                *id = Some(self.next_id);
                self.next_id += 1;
                assigned += 1;
            }
        }
        assigned
    }

    fn allocate_id(&mut self) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Record store persisted as a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens the document at `path`, creating an empty one when missing.
    ///
    /// # Errors
    /// - Returns `Io` when the file cannot be created.
    /// - Returns `Json` when an existing file is not a valid document.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };

        store.locked(Access::Exclusive, || {
            if store.path.exists() {
                store.load()?;
            } else {
                store.save(&JsonDocument {
                    next_id: 1,
                    ..JsonDocument::default()
                })?;
                info!(
                    "event=store_open module=store status=ok backend=json created=true path={}",
                    store.path.display()
                );
            }
            Ok(())
        })?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file carrying the cross-process lock.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(LOCK_SUFFIX);
        PathBuf::from(name)
    }

    /// Runs `f` under the in-process mutex and an OS lock on the sidecar.
    fn locked<T>(&self, access: Access, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let _process_guard = lock_process();
        let sidecar = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        let mut lock = RwLock::new(sidecar);
        match access {
            Access::Shared => {
                let _os_guard = lock.read()?;
                f()
            }
            Access::Exclusive => {
                let _os_guard = lock.write()?;
                f()
            }
        }
    }

    fn load(&self) -> StoreResult<JsonDocument> {
        let file = File::open(&self.path)?;
        let mut document: JsonDocument = serde_json::from_reader(BufReader::new(file))?;
        let assigned = document.assign_missing_ids();
        if assigned > 0 {
            warn!(
                "event=store_load module=store status=repaired backend=json rows_without_id={assigned}"
            );
        }
        Ok(document)
    }

    fn save(&self, document: &JsonDocument) -> StoreResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        temp.persist(&self.path).map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }

    /// Runs one locked read-modify-write cycle.
    fn mutate<T>(&self, f: impl FnOnce(&mut JsonDocument) -> StoreResult<T>) -> StoreResult<T> {
        self.locked(Access::Exclusive, || {
            let mut document = self.load()?;
            let value = f(&mut document)?;
            self.save(&document)?;
            Ok(value)
        })
    }
}

impl RecordStore for JsonFileStore {
    fn insert(&mut self, record: &NewRecord) -> StoreResult<RecordId> {
        record.validate()?;

        let id = self.mutate(|document| {
            let id = document.allocate_id();
            match (&record.kind, &record.magnitude) {
                (RecordKind::Problem, Magnitude::Difficulty(difficulty)) => {
                    document.problems.push(ProblemRow {
                        id: Some(id),
                        date: record.occurred_on.clone(),
                        topic: record.category.clone(),
                        difficulty: Some(Value::String(difficulty.as_str().to_string())),
                        title: record.note.clone(),
                    });
                }
                (RecordKind::Expense, Magnitude::Amount(amount)) => {
                    document.expenses.push(ExpenseRow {
                        id: Some(id),
                        date: record.occurred_on.clone(),
                        amount: Some(serde_json::to_value(amount)?),
                        category: record.category.clone(),
                        subcategory: record.subcategory.clone(),
                        note: record.note.clone(),
                    });
                }
                (kind, _) => {
                    return Err(StoreError::InvalidData(format!(
                        "magnitude does not match record kind `{kind}`"
                    )));
                }
            }
            Ok(id)
        })?;

        info!(
            "event=record_insert module=store status=ok backend=json kind={} id={}",
            record.kind, id
        );
        Ok(id)
    }

    fn scan(&self, kind: RecordKind) -> StoreResult<Vec<Record>> {
        let document = self.locked(Access::Shared, || self.load())?;

        let mut records: Vec<Record> = match kind {
            RecordKind::Problem => document.problems.into_iter().map(problem_record).collect(),
            RecordKind::Expense => document.expenses.into_iter().map(expense_record).collect(),
        };
        records.sort_by_key(|record| record.id);

        debug!(
            "event=record_scan module=store status=ok backend=json kind={} rows={}",
            kind,
            records.len()
        );
        Ok(records)
    }

    fn upsert_note(&mut self, topic: &str, content: &str) -> StoreResult<()> {
        self.mutate(|document| {
            document.notes.insert(
                topic.to_string(),
                NoteEntry::Stamped {
                    content: content.to_string(),
                    updated_at: Utc::now().timestamp_millis(),
                },
            );
            Ok(())
        })?;
        info!("event=note_upsert module=store status=ok backend=json");
        Ok(())
    }

    fn get_note(&self, topic: &str) -> StoreResult<Option<TopicNote>> {
        let document = self.locked(Access::Shared, || self.load())?;
        Ok(document.notes.get(topic).map(|entry| {
            let (content, updated_at) = match entry {
                NoteEntry::Stamped {
                    content,
                    updated_at,
                } => (content.clone(), *updated_at),
                NoteEntry::Plain(content) => (content.clone(), 0),
            };
            TopicNote {
                topic: topic.to_string(),
                content,
                updated_at,
            }
        }))
    }
}

fn lock_process() -> std::sync::MutexGuard<'static, ()> {
    // A panic while holding the guard cannot corrupt `()`; keep serving.
    FILE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn problem_record(row: ProblemRow) -> Record {
    Record {
        id: row.id.unwrap_or_default(),
        kind: RecordKind::Problem,
        occurred_on: row.date,
        category: row.topic,
        subcategory: String::new(),
        magnitude: row.difficulty.and_then(difficulty_magnitude),
        note: row.title,
    }
}

fn expense_record(row: ExpenseRow) -> Record {
    Record {
        id: row.id.unwrap_or_default(),
        kind: RecordKind::Expense,
        occurred_on: row.date,
        category: row.category,
        subcategory: row.subcategory,
        magnitude: row.amount.and_then(amount_magnitude),
        note: row.note,
    }
}

fn difficulty_magnitude(value: Value) -> Option<Magnitude> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(
            Difficulty::parse(&text)
                .map(Magnitude::Difficulty)
                .unwrap_or(Magnitude::Unrecognized(text)),
        ),
        other => Some(Magnitude::Unrecognized(other.to_string())),
    }
}

fn amount_magnitude(value: Value) -> Option<Magnitude> {
    match value {
        Value::Null => None,
        Value::Number(number) => Some(match number.as_f64() {
            Some(amount) => Magnitude::Amount(amount),
            None => Magnitude::Unrecognized(number.to_string()),
        }),
        Value::String(text) => Some(match text.trim().parse::<f64>() {
            Ok(amount) if amount.is_finite() => Magnitude::Amount(amount),
            _ => Magnitude::Unrecognized(text),
        }),
        other => Some(Magnitude::Unrecognized(other.to_string())),
    }
}
