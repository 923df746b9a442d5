//! SQLite-backed record store.
//!
//! # Responsibility
//! - Persist records and topic notes in the migrated `records` /
//!   `topic_notes` tables.
//! - Push the grouped aggregate down into SQL.
//!
//! # Invariants
//! - `records.id` is `AUTOINCREMENT`, so ids are never reused after deletes
//!   done outside this crate.
//! - Date-windowed aggregates only admit real calendar days, matching
//!   `analytics::filter_by_date_range`.
//! - Read paths keep malformed rows (unknown difficulty, text amounts)
//!   instead of rejecting them; the analytics engine decides what counts.

use crate::analytics::{category_label_matches, sort_group_totals, GroupTotal, MatchMode};
use crate::db::migrations::latest_version;
use crate::model::record::{Difficulty, Magnitude, NewRecord, Record, RecordId, RecordKind};
use crate::store::{GroupQuery, RecordStore, StoreError, StoreResult, TopicNote};
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    kind,
    occurred_on,
    category,
    subcategory,
    difficulty,
    amount,
    note
FROM records";

const CANONICAL_DAY_GLOB: &str = "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]";

/// SQLite-backed record store over a migrated connection.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Constructs a store from a connection returned by `db::open_db*`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn insert(&mut self, record: &NewRecord) -> StoreResult<RecordId> {
        record.validate()?;

        let (difficulty, amount) = match &record.magnitude {
            Magnitude::Difficulty(value) => (Some(value.as_str()), None),
            Magnitude::Amount(value) => (None, Some(*value)),
            Magnitude::Unrecognized(_) => {
                return Err(StoreError::InvalidData(
                    "refusing to persist unrecognized magnitude".to_string(),
                ));
            }
        };

        self.conn.execute(
            "INSERT INTO records (
                kind,
                occurred_on,
                category,
                subcategory,
                difficulty,
                amount,
                note
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                record.kind.as_str(),
                record.occurred_on.as_str(),
                record.category.as_str(),
                record.subcategory.as_str(),
                difficulty,
                amount,
                record.note.as_str(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        info!(
            "event=record_insert module=store status=ok backend=sqlite kind={} id={}",
            record.kind, id
        );
        Ok(id)
    }

    fn scan(&self, kind: RecordKind) -> StoreResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE kind = ?1
             ORDER BY id ASC;"
        ))?;

        let mut rows = stmt.query([kind.as_str()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }

        debug!(
            "event=record_scan module=store status=ok backend=sqlite kind={} rows={}",
            kind,
            records.len()
        );
        Ok(records)
    }

    fn grouped_totals(
        &self,
        kind: RecordKind,
        query: &GroupQuery,
    ) -> StoreResult<Vec<GroupTotal>> {
        let start = query.start.as_deref().map(str::trim).filter(|v| !v.is_empty());
        let end = query.end.as_deref().map(str::trim).filter(|v| !v.is_empty());

        let mut stmt = self.conn.prepare(
            "SELECT
                category,
                SUM(amount) AS total,
                COUNT(amount) AS line_count
             FROM records
             WHERE kind = ?1
               AND typeof(amount) IN ('integer', 'real')
               AND (?2 IS NULL OR (occurred_on GLOB ?4
                                   AND date(occurred_on) IS occurred_on
                                   AND occurred_on >= ?2))
               AND (?3 IS NULL OR (occurred_on GLOB ?4
                                   AND date(occurred_on) IS occurred_on
                                   AND occurred_on <= ?3))
             GROUP BY category;",
        )?;

        let mut rows = stmt.query(params![kind.as_str(), start, end, CANONICAL_DAY_GLOB])?;
        let mut totals = Vec::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get("category")?;
            if !category_label_matches(&key, query.category.as_deref(), MatchMode::Exact) {
                continue;
            }
            let count: i64 = row.get("line_count")?;
            totals.push(GroupTotal {
                key,
                sum: row.get("total")?,
                count: usize::try_from(count).map_err(|_| {
                    StoreError::InvalidData(format!("negative group count `{count}`"))
                })?,
            });
        }

        sort_group_totals(&mut totals);
        Ok(totals)
    }

    fn upsert_note(&mut self, topic: &str, content: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO topic_notes (topic, content, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT (topic) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at;",
            params![topic, content],
        )?;
        info!("event=note_upsert module=store status=ok backend=sqlite");
        Ok(())
    }

    fn get_note(&self, topic: &str) -> StoreResult<Option<TopicNote>> {
        let note = self
            .conn
            .query_row(
                "SELECT topic, content, updated_at
                 FROM topic_notes
                 WHERE topic = ?1;",
                [topic],
                |row| {
                    Ok(TopicNote {
                        topic: row.get("topic")?,
                        content: row.get("content")?,
                        updated_at: row.get("updated_at")?,
                    })
                },
            )
            .optional()?;
        Ok(note)
    }
}

fn parse_record_row(row: &Row<'_>) -> StoreResult<Record> {
    let kind_text: String = row.get("kind")?;
    let kind = RecordKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid record kind `{kind_text}` in records.kind"))
    })?;

    let magnitude = match kind {
        RecordKind::Problem => parse_difficulty_value(row.get("difficulty")?),
        RecordKind::Expense => parse_amount_value(row.get("amount")?),
    };

    Ok(Record {
        id: row.get("id")?,
        kind,
        occurred_on: row.get("occurred_on")?,
        category: row.get("category")?,
        subcategory: row.get("subcategory")?,
        magnitude,
        note: row.get("note")?,
    })
}

fn parse_difficulty_value(value: Value) -> Option<Magnitude> {
    match value {
        Value::Null => None,
        Value::Text(text) => Some(
            Difficulty::parse(&text)
                .map(Magnitude::Difficulty)
                .unwrap_or(Magnitude::Unrecognized(text)),
        ),
        Value::Integer(number) => Some(Magnitude::Unrecognized(number.to_string())),
        Value::Real(number) => Some(Magnitude::Unrecognized(number.to_string())),
        Value::Blob(_) => Some(Magnitude::Unrecognized("<blob>".to_string())),
    }
}

fn parse_amount_value(value: Value) -> Option<Magnitude> {
    match value {
        Value::Null => None,
        Value::Real(number) => Some(Magnitude::Amount(number)),
        // i64 -> f64 is exact for any realistic amount.
        Value::Integer(number) => Some(Magnitude::Amount(number as f64)),
        Value::Text(text) => Some(match text.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Magnitude::Amount(number),
            _ => Magnitude::Unrecognized(text),
        }),
        Value::Blob(_) => Some(Magnitude::Unrecognized("<blob>".to_string())),
    }
}
