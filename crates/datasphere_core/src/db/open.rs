//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by the metadata store.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - `open_db*` connections have every migration of their set applied.

use super::migrations::MigrationSet;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with(path, &MigrationSet::embedded())
}

/// Opens a SQLite database file and applies pending migrations from
/// `migrations`, typically a set loaded with [`MigrationSet::from_dir`].
pub fn open_db_with(path: impl AsRef<Path>, migrations: &MigrationSet) -> DbResult<Connection> {
    open_with("file", Some(migrations), || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(
        "memory",
        Some(&MigrationSet::embedded()),
        Connection::open_in_memory,
    )
}

/// Opens and configures a SQLite database file without touching its schema.
///
/// Used by the migration runner, which decides itself what to apply.
pub fn connect(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", None, || Connection::open(path))
}

fn open_with<F>(mode: &str, migrations: Option<&MigrationSet>, open: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    let migrate = migrations.is_some();
    info!("event=db_open module=db status=start mode={mode} migrate={migrate}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, migrations) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, migrations: Option<&MigrationSet>) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if let Some(migrations) = migrations {
        migrations.apply(conn)?;
    }
    Ok(())
}
