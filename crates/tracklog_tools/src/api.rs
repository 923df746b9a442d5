//! Tool handlers for the problem log and expense tracker.
//!
//! # Responsibility
//! - Expose one function per remote-callable tool.
//! - Open a store per call, run the use-case, drop the store.
//! - Render results with each tracker's external field names.
//!
//! # Invariants
//! - Handlers never panic; every failure becomes an `error` envelope.
//! - Every envelope carries `status`.

use crate::config::{Backend, ToolConfig};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracklog_core::analytics::round2;
use tracklog_core::db::open_db;
use tracklog_core::{
    load_categories, AddExpenseRequest, AddProblemRequest, ExpenseQuery, JsonFileStore,
    Magnitude, Record, RecordKind, RecordStore, ServiceResult, SqliteRecordStore,
    TrackerService,
};

type DynService<'a> = TrackerService<&'a mut dyn RecordStore>;

/// Envelope status marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    Saved,
    Error,
}

/// JSON object returned by every tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub status: ToolStatus,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl ToolResponse {
    pub fn ok(body: Value) -> Self {
        Self::with_status(ToolStatus::Ok, body)
    }

    pub fn saved(body: Value) -> Self {
        Self::with_status(ToolStatus::Saved, body)
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(message.into()));
        Self {
            status: ToolStatus::Error,
            body,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }

    /// Body field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Flattened JSON form (`{"status": ..., ...body}`).
    pub fn to_json(&self) -> Value {
        let mut object = self.body.clone();
        let status = match self.status {
            ToolStatus::Ok => "ok",
            ToolStatus::Saved => "saved",
            ToolStatus::Error => "error",
        };
        object.insert("status".to_string(), Value::String(status.to_string()));
        Value::Object(object)
    }

    fn with_status(status: ToolStatus, body: Value) -> Self {
        let body = match body {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self { status, body }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddProblemArgs {
    pub topic: String,
    pub difficulty: String,
    pub title: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListProblemsArgs {
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProblemStatsArgs {
    pub topic: Option<String>,
    pub today: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteArgs {
    pub topic: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopicArgs {
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddExpenseArgs {
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExpenseWindowArgs {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoriesArgs {
    pub kind: String,
}

/// Logs one solved problem.
pub fn add_problem(config: &ToolConfig, args: AddProblemArgs) -> ToolResponse {
    let request = AddProblemRequest {
        topic: args.topic,
        difficulty: args.difficulty,
        title: args.title,
        date: args.date,
    };
    match with_service(config, |service| service.add_problem(&request)) {
        Ok(record) => ToolResponse::saved(json!({
            "id": record.id,
            "title": record.note,
        })),
        Err(message) => failure("add_problem", message),
    }
}

/// Lists problems newest first, optionally narrowed by topic substring.
pub fn list_problems(config: &ToolConfig, args: ListProblemsArgs) -> ToolResponse {
    match with_service(config, |service| service.list_problems(args.topic.as_deref())) {
        Ok(records) => ToolResponse::ok(json!({ "items": render_records(&records) })),
        Err(message) => failure("list_problems", message),
    }
}

/// Totals, today count, difficulty breakdown and daily average.
pub fn problem_stats(config: &ToolConfig, args: ProblemStatsArgs) -> ToolResponse {
    let result = with_service(config, |service| {
        service.problem_stats(args.topic.as_deref(), args.today.as_deref())
    });
    match result {
        Ok(summary) => match serde_json::to_value(&summary) {
            Ok(body) => ToolResponse::ok(body),
            Err(err) => failure("problem_stats", err.to_string()),
        },
        Err(message) => failure("problem_stats", message),
    }
}

/// Saves or overwrites the note for a topic.
pub fn save_note(config: &ToolConfig, args: NoteArgs) -> ToolResponse {
    match with_service(config, |service| service.save_note(&args.topic, &args.content)) {
        Ok(note) => ToolResponse::saved(json!({
            "message": format!("Notes saved for {}.", note.topic),
        })),
        Err(message) => failure("save_note", message),
    }
}

/// Reads the note for a topic.
pub fn get_note(config: &ToolConfig, args: TopicArgs) -> ToolResponse {
    match with_service(config, |service| service.get_note(&args.topic)) {
        Ok(note) => ToolResponse::ok(json!({
            "topic": note.topic,
            "content": note.content,
            "updated_at": note.updated_at,
        })),
        Err(message) => failure("get_note", message),
    }
}

/// Returns the writing instruction a caller follows to draft topic notes.
pub fn generate_notes(args: TopicArgs) -> ToolResponse {
    let topic = args.topic.trim();
    if topic.is_empty() {
        return failure("generate_notes", "invalid input: topic must not be empty");
    }
    ToolResponse::ok(json!({ "instruction": notes_instruction(topic) }))
}

/// Number of problems logged so far.
pub fn dsa_stats(config: &ToolConfig) -> ToolResponse {
    match with_service(config, |service| service.total_solved()) {
        Ok(total) => ToolResponse::ok(json!({ "total_solved": total })),
        Err(message) => failure("dsa_stats", message),
    }
}

/// Logs one expense line.
pub fn add_expense(config: &ToolConfig, args: AddExpenseArgs) -> ToolResponse {
    let request = AddExpenseRequest {
        amount: args.amount,
        category: args.category,
        subcategory: args.subcategory,
        note: args.note,
        date: args.date,
    };
    match with_service(config, |service| service.add_expense(&request)) {
        Ok(record) => ToolResponse::ok(json!({ "id": record.id })),
        Err(message) => failure("add_expense", message),
    }
}

/// Lists expenses inside the window, newest first.
pub fn list_expenses(config: &ToolConfig, args: ExpenseWindowArgs) -> ToolResponse {
    let query = expense_query(args);
    match with_service(config, |service| service.list_expenses(&query)) {
        Ok(records) => ToolResponse::ok(json!({ "items": render_records(&records) })),
        Err(message) => failure("list_expenses", message),
    }
}

/// Spending per category inside the window, largest first.
pub fn summarize_expenses(config: &ToolConfig, args: ExpenseWindowArgs) -> ToolResponse {
    let query = expense_query(args);
    match with_service(config, |service| service.expense_summary(&query)) {
        Ok(summary) => {
            let groups: Vec<Value> = summary
                .groups
                .iter()
                .map(|group| {
                    json!({
                        "category": group.key,
                        "total_amount": round2(group.sum),
                        "count": group.count,
                    })
                })
                .collect();
            ToolResponse::ok(json!({
                "total_amount": summary.total_amount,
                "count": summary.count,
                "groups": groups,
            }))
        }
        Err(message) => failure("summarize_expenses", message),
    }
}

/// Category labels for a tracker kind.
pub fn categories(config: &ToolConfig, args: CategoriesArgs) -> ToolResponse {
    let Some(kind) = RecordKind::parse(&args.kind) else {
        return failure(
            "categories",
            format!(
                "invalid input: kind must be problem|expense, got `{}`",
                args.kind.trim()
            ),
        );
    };
    let labels = load_categories(kind, config.catalog_path.as_deref());
    ToolResponse::ok(json!({ "kind": kind.as_str(), "categories": labels }))
}

/// Renders one record with its tracker's external field names.
pub fn render_record(record: &Record) -> Value {
    let fields = record.kind.fields();
    let mut object = Map::new();
    object.insert("id".to_string(), json!(record.id));
    object.insert(fields.date.to_string(), json!(record.occurred_on));
    object.insert(fields.category.to_string(), json!(record.category));
    if let Some(subcategory) = fields.subcategory {
        object.insert(subcategory.to_string(), json!(record.subcategory));
    }
    object.insert(
        fields.magnitude.to_string(),
        render_magnitude(record.magnitude.as_ref()),
    );
    object.insert(fields.note.to_string(), json!(record.note));
    Value::Object(object)
}

fn render_records(records: &[Record]) -> Vec<Value> {
    records.iter().map(render_record).collect()
}

fn render_magnitude(magnitude: Option<&Magnitude>) -> Value {
    match magnitude {
        None => Value::Null,
        Some(Magnitude::Difficulty(difficulty)) => json!(difficulty.as_str()),
        Some(Magnitude::Amount(amount)) => json!(amount),
        Some(Magnitude::Unrecognized(raw)) => json!(raw),
    }
}

fn notes_instruction(topic: &str) -> String {
    format!(
        "Create concise DSA notes for {topic}.\n\
         Include:\n\
         - concept\n\
         - patterns\n\
         - complexity\n\
         - common interview questions\n\
         When done, call save_note with topic `{topic}` and the notes as content."
    )
}

fn expense_query(args: ExpenseWindowArgs) -> ExpenseQuery {
    ExpenseQuery {
        start_date: args.start_date,
        end_date: args.end_date,
        category: args.category,
    }
}

fn failure(tool: &str, message: impl Into<String>) -> ToolResponse {
    let message = message.into();
    warn!("event=tool_failed module=tools status=error tool={tool} message={message}");
    ToolResponse::error(message)
}

fn with_service<T>(
    config: &ToolConfig,
    f: impl FnOnce(&mut DynService<'_>) -> ServiceResult<T>,
) -> Result<T, String> {
    match config.backend {
        Backend::Sqlite => {
            let conn = open_db(&config.data_path)
                .map_err(|err| format!("database open failed: {err}"))?;
            let mut store = SqliteRecordStore::try_new(&conn)
                .map_err(|err| format!("store init failed: {err}"))?;
            let mut service: DynService<'_> =
                TrackerService::new(&mut store as &mut dyn RecordStore);
            f(&mut service).map_err(|err| err.to_string())
        }
        Backend::Json => {
            let mut store = JsonFileStore::open(&config.data_path)
                .map_err(|err| format!("store open failed: {err}"))?;
            info!(
                "event=store_open module=tools status=ok backend=json path={}",
                config.data_path.display()
            );
            let mut service: DynService<'_> =
                TrackerService::new(&mut store as &mut dyn RecordStore);
            f(&mut service).map_err(|err| err.to_string())
        }
    }
}
