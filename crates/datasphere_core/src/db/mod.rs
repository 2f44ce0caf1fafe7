//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the metadata store.
//! - Apply and revert schema migrations in deterministic order.
//! - Provide transaction and deadline helpers for orchestrators.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Connections handed to repositories have `foreign_keys=ON`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;
mod schema;
mod tx;

pub use open::{connect, open_db, open_db_in_memory, open_db_with};
pub use schema::{ensure_connection_ready, ensure_connection_ready_with};
pub use tx::{begin, Deadline, TxMode};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    ForeignKeysDisabled,
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    MigrationSource {
        path: PathBuf,
        message: String,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "database schema version {actual_version} does not match expected {expected_version}; apply migrations first"
            ),
            Self::ForeignKeysDisabled => {
                write!(f, "foreign key enforcement is disabled on this connection")
            }
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
            Self::MigrationSource { path, message } => {
                write!(f, "invalid migrations source `{}`: {message}", path.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
