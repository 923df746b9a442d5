//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by the record store.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a 5s busy timeout.
//! - File connections run in WAL journal mode so readers never block the
//!   single appending writer.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult, DbTarget};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with(DbTarget::File(path.to_path_buf()), || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(DbTarget::Memory, Connection::open_in_memory)
}

fn open_with(
    target: DbTarget,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode={}",
        target.mode()
    );

    let result = connect()
        .map_err(|source| DbError::Open {
            target: target.clone(),
            source,
        })
        .and_then(|mut conn| bootstrap_connection(&mut conn, &target).map(|()| conn));

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            target.mode(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code={} error={}",
            target.mode(),
            started_at.elapsed().as_millis(),
            error_code(err),
            err
        ),
    }
    result
}

fn bootstrap_connection(conn: &mut Connection, target: &DbTarget) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(configure_failed(target, "foreign_keys"))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(configure_failed(target, "busy_timeout"))?;
    if let DbTarget::File(_) = target {
        let journal: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(configure_failed(target, "journal_mode"))?;
        info!("event=db_journal module=db status=ok journal_mode={journal}");
    }
    apply_migrations(conn)
}

fn configure_failed(
    target: &DbTarget,
    setting: &'static str,
) -> impl FnOnce(rusqlite::Error) -> DbError {
    let target = target.clone();
    move |source| DbError::Configure {
        target,
        setting,
        source,
    }
}

fn error_code(err: &DbError) -> &'static str {
    match err {
        DbError::Open { .. } => "db_open_failed",
        DbError::Configure { .. } => "db_configure_failed",
        DbError::Migration { .. } => "db_migration_failed",
        DbError::UnsupportedSchemaVersion { .. } => "db_schema_too_new",
        DbError::Sqlite(_) => "db_bootstrap_failed",
    }
}
