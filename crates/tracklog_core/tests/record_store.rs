use rusqlite::params;
use serde_json::json;
use tracklog_core::db::{open_db, open_db_in_memory};
use tracklog_core::{
    Difficulty, GroupQuery, JsonFileStore, Magnitude, NewRecord, RecordKind, RecordStore,
    SqliteRecordStore, StoreError,
};

fn seed(store: &mut dyn RecordStore) {
    store
        .insert(&NewRecord::problem("2024-01-01", "Arrays", Difficulty::Easy, "Two Sum"))
        .unwrap();
    store
        .insert(&NewRecord::expense("2024-01-01", 10.0, "Food", "lunch", ""))
        .unwrap();
    store
        .insert(&NewRecord::expense("2024-01-02", 5.0, "Food", "", "coffee"))
        .unwrap();
    store
        .insert(&NewRecord::expense("2024-01-03", 20.0, "Travel", "train", ""))
        .unwrap();
    store
        .insert(&NewRecord::problem("2024-01-02", "Graphs", Difficulty::Hard, "Islands"))
        .unwrap();
}

#[test]
fn sqlite_scan_returns_kind_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let mut store = SqliteRecordStore::try_new(&conn).unwrap();
    seed(&mut store);

    let problems = store.scan(RecordKind::Problem).unwrap();
    assert_eq!(problems.len(), 2);
    assert!(problems[0].id < problems[1].id);
    assert_eq!(problems[0].category, "Arrays");
    assert_eq!(
        problems[1].magnitude,
        Some(Magnitude::Difficulty(Difficulty::Hard))
    );

    let expenses = store.scan(RecordKind::Expense).unwrap();
    assert_eq!(expenses.len(), 3);
    assert_eq!(expenses[0].subcategory, "lunch");
    assert_eq!(expenses[1].note, "coffee");
}

#[test]
fn sqlite_store_rejects_unmigrated_connection() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = SqliteRecordStore::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        StoreError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn insert_rejects_invalid_records_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let mut store = SqliteRecordStore::try_new(&conn).unwrap();

    let err = store
        .insert(&NewRecord::expense("2024-02-30", 1.0, "Food", "", ""))
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(store.scan(RecordKind::Expense).unwrap().is_empty());
}

#[test]
fn sqlite_ids_are_not_reused_after_external_delete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ids.db");

    let last_id = {
        let conn = open_db(&path).unwrap();
        let mut store = SqliteRecordStore::try_new(&conn).unwrap();
        seed(&mut store);
        let last = store.scan(RecordKind::Problem).unwrap().last().unwrap().id;
        conn.execute("DELETE FROM records WHERE id = ?1;", params![last])
            .unwrap();
        last
    };

    let conn = open_db(&path).unwrap();
    let mut store = SqliteRecordStore::try_new(&conn).unwrap();
    let next = store
        .insert(&NewRecord::problem("2024-01-05", "Heap", Difficulty::Medium, "Kth"))
        .unwrap();
    assert!(next > last_id);
}

#[test]
fn sqlite_read_path_keeps_malformed_rows() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO records (kind, occurred_on, category, difficulty, note)
         VALUES ('problem', 'last tuesday', 'Arrays', 'Insane', 'odd row');",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO records (kind, occurred_on, category, amount, note)
         VALUES ('expense', '2024-01-01', 'Food', 'a lot', 'odd amount');",
        [],
    )
    .unwrap();

    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let problems = store.scan(RecordKind::Problem).unwrap();
    assert_eq!(
        problems[0].magnitude,
        Some(Magnitude::Unrecognized("Insane".to_string()))
    );
    assert_eq!(problems[0].occurred_on, "last tuesday");

    let groups = store
        .grouped_totals(RecordKind::Expense, &GroupQuery::default())
        .unwrap();
    assert!(groups.is_empty());
}

#[test]
fn json_store_creates_document_and_reopens_with_same_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracklog.json");

    let first_ids: Vec<i64> = {
        let mut store = JsonFileStore::open(&path).unwrap();
        seed(&mut store);
        store
            .scan(RecordKind::Expense)
            .unwrap()
            .iter()
            .map(|record| record.id)
            .collect()
    };
    assert!(path.exists());

    let mut reopened = JsonFileStore::open(&path).unwrap();
    let ids: Vec<i64> = reopened
        .scan(RecordKind::Expense)
        .unwrap()
        .iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ids, first_ids);

    let next = reopened
        .insert(&NewRecord::expense("2024-01-09", 1.0, "Gifts", "", ""))
        .unwrap();
    assert_eq!(next, 6);
}

#[test]
fn json_store_reads_legacy_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("categories.json");
    std::fs::write(
        &path,
        serde_json::to_string(&json!({
            "problems": [
                {"date": "2024-01-01", "topic": "Arrays", "difficulty": "Easy", "title": "Two Sum"},
                {"date": "2024-01-01", "topic": "Arrays", "difficulty": "Insane", "title": "??"}
            ],
            "notes": {"Arrays": "prefix sums"}
        }))
        .unwrap(),
    )
    .unwrap();

    let mut store = JsonFileStore::open(&path).unwrap();
    let problems = store.scan(RecordKind::Problem).unwrap();
    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0].id, 1);
    assert_eq!(
        problems[1].magnitude,
        Some(Magnitude::Unrecognized("Insane".to_string()))
    );

    let note = store.get_note("Arrays").unwrap().unwrap();
    assert_eq!(note.content, "prefix sums");

    let new_id = store
        .insert(&NewRecord::problem("2024-01-02", "Trees", Difficulty::Medium, "Depth"))
        .unwrap();
    assert_eq!(new_id, 3);

    let persisted: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(persisted["problems"][0]["id"], json!(1));
    assert_eq!(persisted["next_id"], json!(4));
}

#[test]
fn json_store_reports_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JsonFileStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::Json(_)));
}

#[test]
fn note_upsert_overwrites_per_exact_topic() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut sqlite = SqliteRecordStore::try_new(&conn).unwrap();
    let mut json_store = JsonFileStore::open(dir.path().join("notes.json")).unwrap();
    let stores: [&mut dyn RecordStore; 2] = [&mut sqlite, &mut json_store];

    for store in stores {
        store.upsert_note("Graphs", "bfs").unwrap();
        store.upsert_note("Graphs", "bfs + dfs").unwrap();
        store.upsert_note("graphs", "lowercase twin").unwrap();

        assert_eq!(store.get_note("Graphs").unwrap().unwrap().content, "bfs + dfs");
        assert_eq!(
            store.get_note("graphs").unwrap().unwrap().content,
            "lowercase twin"
        );
        assert!(store.get_note("Trees").unwrap().is_none());
    }
}

#[test]
fn grouped_totals_agree_between_backends() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut sqlite = SqliteRecordStore::try_new(&conn).unwrap();
    let mut json_store = JsonFileStore::open(dir.path().join("groups.json")).unwrap();
    seed(&mut sqlite);
    seed(&mut json_store);

    let queries = [
        GroupQuery::default(),
        GroupQuery {
            start: Some("2024-01-02".to_string()),
            end: None,
            category: None,
        },
        GroupQuery {
            start: None,
            end: Some("2024-01-02".to_string()),
            category: Some("FOOD".to_string()),
        },
    ];

    for query in &queries {
        let from_sql = sqlite.grouped_totals(RecordKind::Expense, query).unwrap();
        let from_json = json_store
            .grouped_totals(RecordKind::Expense, query)
            .unwrap();
        assert_eq!(from_sql, from_json, "query {query:?}");
    }

    let all = sqlite
        .grouped_totals(RecordKind::Expense, &GroupQuery::default())
        .unwrap();
    let flat: Vec<(&str, f64, usize)> = all
        .iter()
        .map(|group| (group.key.as_str(), group.sum, group.count))
        .collect();
    assert_eq!(flat, vec![("Travel", 20.0, 1), ("Food", 15.0, 2)]);
}

#[test]
fn grouped_windows_skip_impossible_days_on_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut sqlite = SqliteRecordStore::try_new(&conn).unwrap();
    seed(&mut sqlite);
    conn.execute(
        "INSERT INTO records (kind, occurred_on, category, amount)
         VALUES ('expense', '2024-02-30', 'Food', 10.0);",
        [],
    )
    .unwrap();

    let path = dir.path().join("impossible.json");
    let mut json_store = JsonFileStore::open(&path).unwrap();
    seed(&mut json_store);
    let mut document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    document["expenses"]
        .as_array_mut()
        .unwrap()
        .push(json!({"id": 50, "date": "2024-02-30", "category": "Food", "amount": 10.0}));
    std::fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();

    let windowed = GroupQuery {
        start: Some("2024-02-01".to_string()),
        end: None,
        category: None,
    };
    let from_sql = sqlite.grouped_totals(RecordKind::Expense, &windowed).unwrap();
    let from_json = json_store
        .grouped_totals(RecordKind::Expense, &windowed)
        .unwrap();
    assert!(from_sql.is_empty(), "{from_sql:?}");
    assert_eq!(from_sql, from_json);

    let bounded = GroupQuery {
        start: None,
        end: Some("2024-12-31".to_string()),
        category: Some("food".to_string()),
    };
    let from_sql = sqlite.grouped_totals(RecordKind::Expense, &bounded).unwrap();
    assert_eq!(from_sql.len(), 1);
    assert_eq!((from_sql[0].sum, from_sql[0].count), (15.0, 2));
    assert_eq!(
        from_sql,
        json_store.grouped_totals(RecordKind::Expense, &bounded).unwrap()
    );

    let unbounded = GroupQuery::default();
    assert_eq!(
        sqlite.grouped_totals(RecordKind::Expense, &unbounded).unwrap(),
        json_store
            .grouped_totals(RecordKind::Expense, &unbounded)
            .unwrap()
    );
}

#[test]
fn scan_where_applies_predicate() {
    let conn = open_db_in_memory().unwrap();
    let mut store = SqliteRecordStore::try_new(&conn).unwrap();
    seed(&mut store);

    let big = store
        .scan_where(RecordKind::Expense, &|record| {
            record
                .magnitude
                .as_ref()
                .and_then(|magnitude| magnitude.amount())
                .is_some_and(|amount| amount >= 10.0)
        })
        .unwrap();
    assert_eq!(big.len(), 2);
}
