//! Remote-callable tools over the tracklog core.
//!
//! Handlers return `{status, ...}` envelopes; the transport that serves them
//! lives outside this crate.

pub mod api;
pub mod config;
pub mod dispatch;

pub use api::{ToolResponse, ToolStatus};
pub use config::{
    active_config, configure, Backend, ToolConfig, BACKEND_ENV, CATALOG_PATH_ENV, DATA_PATH_ENV,
};
pub use dispatch::{call_tool, call_tool_with, TOOL_NAMES};
