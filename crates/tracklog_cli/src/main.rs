//! One-shot tool runner.
//!
//! # Responsibility
//! - Invoke one tool by name with JSON arguments and print its envelope.
//! - Let flags override the `TRACKLOG_*` environment config.

use clap::Parser;
use log::error;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracklog_core::{core_version, default_log_level, init_logging, LogSink};
use tracklog_tools::{
    call_tool, configure, Backend, ToolConfig, ToolResponse, BACKEND_ENV, TOOL_NAMES,
};

#[derive(Parser, Debug)]
#[command(name = "tracklog")]
#[command(about = "Log solved problems and expenses, then query them")]
#[command(version)]
struct Args {
    /// Tool to call (omit with --list)
    tool: Option<String>,

    /// Tool arguments as a JSON object
    args: Option<String>,

    /// Storage backend: sqlite or json
    #[arg(long)]
    backend: Option<String>,

    /// Database or JSON data file
    #[arg(long)]
    data: Option<PathBuf>,

    /// Category catalog side file
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when omitted
    #[arg(long)]
    log_dir: Option<String>,

    /// Print tool names and exit
    #[arg(long)]
    list: bool,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list {
        for name in TOOL_NAMES {
            println!("{name}");
        }
        return ExitCode::SUCCESS;
    }

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    let logging = LogSink::from_dir(args.log_dir.as_deref())
        .and_then(|sink| init_logging(&level, sink));
    if let Err(err) = logging {
        eprintln!("tracklog: logging disabled: {err}");
    }

    let response = match run(&args) {
        Ok(response) => response,
        Err(message) => {
            error!("event=cli_failed module=cli status=error message={message}");
            ToolResponse::error(message)
        }
    };
    print_response(&response, args.pretty);

    if response.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(args: &Args) -> Result<ToolResponse, String> {
    let tool = args
        .tool
        .as_deref()
        .ok_or_else(|| format!("tracklog {}: missing tool name; try --list", core_version()))?;
    let tool_args = parse_tool_args(args.args.as_deref())?;
    configure(resolve_config(args)?)?;
    Ok(call_tool(tool, tool_args))
}

fn resolve_config(args: &Args) -> Result<ToolConfig, String> {
    resolve_config_from(args, |key| std::env::var(key).ok())
}

/// A `--backend` flag replaces `TRACKLOG_BACKEND` before the env value is parsed.
/// The env data path is kept only when it belongs to the same backend.
fn resolve_config_from(
    args: &Args,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ToolConfig, String> {
    let mut config = match args.backend.as_deref() {
        None => ToolConfig::from_lookup(&lookup)?,
        Some(raw) => {
            let backend = Backend::parse(raw)?;
            let env_backend = lookup(BACKEND_ENV)
                .and_then(|value| Backend::parse(&value).ok())
                .unwrap_or(Backend::Sqlite);
            let from_env = ToolConfig::from_lookup(|key| {
                if key == BACKEND_ENV {
                    None
                } else {
                    lookup(key)
                }
            })?;
            if backend == env_backend {
                ToolConfig { backend, ..from_env }
            } else {
                ToolConfig {
                    catalog_path: from_env.catalog_path,
                    ..ToolConfig::with_backend(backend)
                }
            }
        }
    };
    if let Some(path) = &args.data {
        config.data_path = path.clone();
    }
    if let Some(path) = &args.catalog {
        config.catalog_path = Some(path.clone());
    }
    Ok(config)
}

fn parse_tool_args(raw: Option<&str>) -> Result<Value, String> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(Value::Null),
        Some(raw) => {
            serde_json::from_str(raw).map_err(|err| format!("tool arguments are not JSON: {err}"))
        }
    }
}

fn print_response(response: &ToolResponse, pretty: bool) {
    let value = response.to_json();
    let rendered = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("tracklog: failed to render result: {err}"),
    }
}
