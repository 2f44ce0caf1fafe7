//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations and revert applied ones atomically.
//! - Load migration pairs from a directory when one is configured.
//!
//! # Invariants
//! - `version` values must remain monotonic and gap-free, starting at 1.
//! - Every migration carries both an up and a down script.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

static MIGRATION_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)_([A-Za-z0-9_]+)\.(up|down)\.sql$").expect("valid migration file regex")
});

/// One reversible schema step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub name: Cow<'static, str>,
    up: Cow<'static, str>,
    down: Cow<'static, str>,
}

impl Migration {
    const fn embedded(
        version: u32,
        name: &'static str,
        up: &'static str,
        down: &'static str,
    ) -> Self {
        Self {
            version,
            name: Cow::Borrowed(name),
            up: Cow::Borrowed(up),
            down: Cow::Borrowed(down),
        }
    }
}

const EMBEDDED: &[Migration] = &[Migration::embedded(
    1,
    "init",
    include_str!("0001_init.up.sql"),
    include_str!("0001_init.down.sql"),
)];

/// Ordered set of migrations from one source.
#[derive(Debug, Clone)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

impl MigrationSet {
    /// Migrations compiled into this binary.
    pub fn embedded() -> Self {
        Self {
            migrations: EMBEDDED.to_vec(),
        }
    }

    /// Loads `NNNN_name.up.sql` / `NNNN_name.down.sql` pairs from `dir`.
    ///
    /// Files not matching the naming pattern are ignored.
    ///
    /// # Errors
    /// - `DbError::MigrationSource` when the directory cannot be read, a
    ///   script lacks its counterpart, versions repeat, or versions have gaps.
    pub fn from_dir(dir: impl AsRef<Path>) -> DbResult<Self> {
        let dir = dir.as_ref();
        let source_error = |message: String| DbError::MigrationSource {
            path: dir.to_path_buf(),
            message,
        };

        let entries =
            std::fs::read_dir(dir).map_err(|err| source_error(format!("cannot read: {err}")))?;

        let mut pairs: BTreeMap<u32, (String, Option<String>, Option<String>)> = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|err| source_error(format!("cannot read entry: {err}")))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(captures) = MIGRATION_FILE_RE.captures(file_name) else {
                continue;
            };

            let version: u32 = captures[1]
                .parse()
                .map_err(|_| source_error(format!("invalid version in `{file_name}`")))?;
            let name = captures[2].to_string();
            let sql = std::fs::read_to_string(entry.path())
                .map_err(|err| source_error(format!("cannot read `{file_name}`: {err}")))?;

            let slot = pairs
                .entry(version)
                .or_insert_with(|| (name.clone(), None, None));
            if slot.0 != name {
                return Err(source_error(format!(
                    "version {version} is used by both `{}` and `{name}`",
                    slot.0
                )));
            }
            let target = if &captures[3] == "up" {
                &mut slot.1
            } else {
                &mut slot.2
            };
            if target.is_some() {
                return Err(source_error(format!("duplicate script `{file_name}`")));
            }
            *target = Some(sql);
        }

        let mut migrations = Vec::with_capacity(pairs.len());
        for (expected, (version, (name, up, down))) in (1u32..).zip(pairs) {
            if version != expected {
                return Err(source_error(format!(
                    "expected migration version {expected}, found {version}"
                )));
            }
            let (Some(up), Some(down)) = (up, down) else {
                return Err(source_error(format!(
                    "migration {version}_{name} needs both up and down scripts"
                )));
            };
            migrations.push(Migration {
                version,
                name: Cow::Owned(name),
                up: Cow::Owned(up),
                down: Cow::Owned(down),
            });
        }

        Ok(Self { migrations })
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Returns the latest migration version in this set.
    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map_or(0, |migration| migration.version)
    }

    /// Applies all pending migrations in one transaction.
    ///
    /// Returns the number of migrations applied.
    pub fn apply(&self, conn: &mut Connection) -> DbResult<usize> {
        let current_version = current_version(conn)?;
        let latest = self.latest_version();

        if current_version > latest {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: current_version,
                latest_supported: latest,
            });
        }

        if current_version == latest {
            return Ok(0);
        }

        let tx = conn.transaction()?;
        let mut applied = 0;
        for migration in &self.migrations {
            if migration.version <= current_version {
                continue;
            }

            tx.execute_batch(&migration.up)?;
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
            info!(
                "event=migration_apply module=db status=ok version={} name={}",
                migration.version, migration.name
            );
            applied += 1;
        }
        tx.commit()?;

        Ok(applied)
    }

    /// Reverts every applied migration, newest first, in one transaction.
    ///
    /// Returns the number of migrations reverted.
    pub fn revert(&self, conn: &mut Connection) -> DbResult<usize> {
        let current_version = current_version(conn)?;
        let latest = self.latest_version();

        if current_version > latest {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: current_version,
                latest_supported: latest,
            });
        }

        if current_version == 0 {
            return Ok(0);
        }

        let tx = conn.transaction()?;
        let mut reverted = 0;
        for migration in self.migrations.iter().rev() {
            if migration.version > current_version {
                continue;
            }

            tx.execute_batch(&migration.down)?;
            tx.execute_batch(&format!(
                "PRAGMA user_version = {};",
                migration.version - 1
            ))?;
            info!(
                "event=migration_revert module=db status=ok version={} name={}",
                migration.version, migration.name
            );
            reverted += 1;
        }
        tx.commit()?;

        Ok(reverted)
    }
}

/// Returns the latest embedded migration version known by this binary.
pub fn latest_version() -> u32 {
    EMBEDDED.last().map_or(0, |migration| migration.version)
}

/// Applies all pending embedded migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    MigrationSet::embedded().apply(conn).map(|_| ())
}

/// Reverts all embedded migrations on the provided connection.
pub fn revert_migrations(conn: &mut Connection) -> DbResult<()> {
    MigrationSet::embedded().revert(conn).map(|_| ())
}

/// Reads the schema version mirrored in `PRAGMA user_version`.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
