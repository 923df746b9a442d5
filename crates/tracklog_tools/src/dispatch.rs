//! Name-based tool dispatch.
//!
//! # Responsibility
//! - Map a tool name plus JSON arguments onto the typed handler.
//! - Turn unknown names and malformed arguments into error envelopes.

use crate::api::{self, ToolResponse};
use crate::config::{active_config, ToolConfig};
use log::info;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;

/// Every callable tool name, aliases excluded.
pub const TOOL_NAMES: [&str; 11] = [
    "add_problem",
    "list_problems",
    "problem_stats",
    "save_note",
    "get_note",
    "generate_notes",
    "dsa_stats",
    "add_expense",
    "list_expenses",
    "summarize_expenses",
    "categories",
];

/// Calls `name` against the process-wide config.
pub fn call_tool(name: &str, args: Value) -> ToolResponse {
    match active_config() {
        Ok(config) => call_tool_with(config, name, args),
        Err(err) => ToolResponse::error(format!("tool config invalid: {err}")),
    }
}

/// Calls `name` against an explicit config.
///
/// `args` may be `null` or an object; anything else is rejected.
pub fn call_tool_with(config: &ToolConfig, name: &str, args: Value) -> ToolResponse {
    let started = Instant::now();
    let name = name.trim();
    let response = route(config, name, args);
    info!(
        "event=tool_call module=tools status={} tool={} backend={} elapsed_ms={}",
        if response.is_error() { "error" } else { "ok" },
        name,
        config.backend,
        started.elapsed().as_millis()
    );
    response
}

fn route(config: &ToolConfig, name: &str, args: Value) -> ToolResponse {
    match name {
        "add_problem" => with_args(name, args, |args| api::add_problem(config, args)),
        "list_problems" | "revision_sheet" => {
            with_args(name, args, |args| api::list_problems(config, args))
        }
        "problem_stats" => with_args(name, args, |args| api::problem_stats(config, args)),
        "save_note" => with_args(name, args, |args| api::save_note(config, args)),
        "get_note" => with_args(name, args, |args| api::get_note(config, args)),
        "generate_notes" => with_args(name, args, api::generate_notes),
        "dsa_stats" => api::dsa_stats(config),
        "add_expense" => with_args(name, args, |args| api::add_expense(config, args)),
        "list_expenses" => with_args(name, args, |args| api::list_expenses(config, args)),
        "summarize_expenses" => {
            with_args(name, args, |args| api::summarize_expenses(config, args))
        }
        "categories" => with_args(name, args, |args| api::categories(config, args)),
        other => ToolResponse::error(format!(
            "unknown tool `{other}`; expected one of {}",
            TOOL_NAMES.join("|")
        )),
    }
}

fn with_args<A: DeserializeOwned>(
    name: &str,
    args: Value,
    handler: impl FnOnce(A) -> ToolResponse,
) -> ToolResponse {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        Value::Object(map) => Value::Object(map),
        other => {
            return ToolResponse::error(format!(
                "invalid arguments for `{name}`: expected an object, got {other}"
            ))
        }
    };
    match serde_json::from_value(args) {
        Ok(parsed) => handler(parsed),
        Err(err) => ToolResponse::error(format!("invalid arguments for `{name}`: {err}")),
    }
}
