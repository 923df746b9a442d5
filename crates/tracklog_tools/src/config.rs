//! Tool-layer configuration.
//!
//! # Responsibility
//! - Resolve which backend and data file the tools use.
//! - Freeze that choice once per process.
//!
//! # Invariants
//! - Environment is read at most once; explicit `configure()` wins if it
//!   happens first.
//! - Resolution never panics; bad values surface as error strings.

use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const BACKEND_ENV: &str = "TRACKLOG_BACKEND";
pub const DATA_PATH_ENV: &str = "TRACKLOG_DATA_PATH";
pub const CATALOG_PATH_ENV: &str = "TRACKLOG_CATALOG_PATH";

const SQLITE_FILE_NAME: &str = "tracklog.sqlite3";
const JSON_FILE_NAME: &str = "tracklog.json";

static ACTIVE_CONFIG: OnceCell<ToolConfig> = OnceCell::new();

/// Persistence engine behind the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Json,
}

impl Backend {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "sqlite" | "sqlite3" | "db" => Ok(Self::Sqlite),
            "json" | "file" => Ok(Self::Json),
            other => Err(format!(
                "unsupported backend `{other}`; expected sqlite|json"
            )),
        }
    }

    fn default_file_name(self) -> &'static str {
        match self {
            Self::Sqlite => SQLITE_FILE_NAME,
            Self::Json => JSON_FILE_NAME,
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Resolved tool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub backend: Backend,
    /// SQLite database file or JSON document.
    pub data_path: PathBuf,
    /// Optional category side file.
    pub catalog_path: Option<PathBuf>,
}

impl ToolConfig {
    /// Config for `backend` with its default file in the temp directory.
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            data_path: std::env::temp_dir().join(backend.default_file_name()),
            catalog_path: None,
        }
    }

    /// Reads `TRACKLOG_*` variables from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves config through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend = match read(BACKEND_ENV) {
            Some(value) => Backend::parse(&value)?,
            None => Backend::Sqlite,
        };
        let mut config = Self::with_backend(backend);
        if let Some(path) = read(DATA_PATH_ENV) {
            config.data_path = PathBuf::from(path);
        }
        config.catalog_path = read(CATALOG_PATH_ENV).map(PathBuf::from);
        Ok(config)
    }
}

/// Pins the process-wide config.
///
/// # Errors
/// - Returns an error when a different config is already active.
pub fn configure(config: ToolConfig) -> Result<(), String> {
    let active = ACTIVE_CONFIG.get_or_init(|| config.clone());
    if *active != config {
        return Err(format!(
            "tool config already active ({} at `{}`); refusing to switch",
            active.backend,
            active.data_path.display()
        ));
    }
    Ok(())
}

/// Returns the pinned config, resolving it from the environment on first
/// use.
pub fn active_config() -> Result<&'static ToolConfig, String> {
    ACTIVE_CONFIG.get_or_try_init(ToolConfig::from_env)
}

#[cfg(test)]
mod tests {
    use super::{Backend, ToolConfig, BACKEND_ENV, CATALOG_PATH_ENV, DATA_PATH_ENV};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_sqlite_in_temp_dir() {
        let config = ToolConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert!(config.data_path.starts_with(std::env::temp_dir()));
        assert_eq!(config.catalog_path, None);
    }

    #[test]
    fn reads_backend_paths_and_ignores_blank_values() {
        let config = ToolConfig::from_lookup(lookup(&[
            (BACKEND_ENV, " JSON "),
            (DATA_PATH_ENV, "/data/log.json"),
            (CATALOG_PATH_ENV, "   "),
        ]))
        .unwrap();
        assert_eq!(config.backend, Backend::Json);
        assert_eq!(config.data_path, PathBuf::from("/data/log.json"));
        assert_eq!(config.catalog_path, None);
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = ToolConfig::from_lookup(lookup(&[(BACKEND_ENV, "postgres")])).unwrap_err();
        assert!(err.contains("postgres"));
    }
}
