//! Readiness checks for connections handed to the repositories.

use super::migrations::{current_version, MigrationSet};
use super::{DbError, DbResult};
use rusqlite::Connection;

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("file", &["id", "filename", "size", "name", "chunks_count"]),
    ("chunk", &["id", "file_id", "chunk_number", "file_key"]),
];

/// Verifies that `conn` can serve repository calls against the embedded
/// migrations.
///
/// # Errors
/// - `ForeignKeysDisabled` when `PRAGMA foreign_keys` is off.
/// - `UninitializedConnection` when the schema version is not current.
/// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema drifted.
pub fn ensure_connection_ready(conn: &Connection) -> DbResult<()> {
    ensure_connection_ready_with(conn, &MigrationSet::embedded())
}

/// Same as [`ensure_connection_ready`], with the schema version expected
/// from `migrations` instead of the embedded set.
pub fn ensure_connection_ready_with(conn: &Connection, migrations: &MigrationSet) -> DbResult<()> {
    let foreign_keys: i64 = conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))?;
    if foreign_keys != 1 {
        return Err(DbError::ForeignKeysDisabled);
    }

    let actual_version = current_version(conn)?;
    let expected_version = migrations.latest_version();
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(DbError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(DbError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
