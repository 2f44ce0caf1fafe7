//! File repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create, fetch, search and delete `file` rows.
//!
//! # Invariants
//! - No update path exists; a file row changes only by deletion.
//! - Deleting a file cascades to its chunk rows at the schema level.
//! - Empty search results are reported as `NotFound`.

use super::OpTrace;
use crate::error::{StorageError, StorageResult};
use crate::model::file::{File, FileId, NewFile};
use rusqlite::{params, Row, Transaction};

const FILE_SELECT_SQL: &str = "SELECT
    id,
    filename,
    size,
    name,
    chunks_count
FROM file";

/// Transaction-scoped access to `File` rows.
pub trait FileRepository {
    /// Inserts a file and returns its store-assigned id.
    fn create_file(
        &self,
        tx: &Transaction<'_>,
        file: &NewFile,
        request_id: &str,
    ) -> StorageResult<FileId>;
    /// Fetches one file by id.
    fn get_file_by_id(
        &self,
        tx: &Transaction<'_>,
        id: FileId,
        request_id: &str,
    ) -> StorageResult<File>;
    /// Case-insensitive substring search over `filename` and `name`.
    fn search_files(
        &self,
        tx: &Transaction<'_>,
        query: &str,
        request_id: &str,
    ) -> StorageResult<Vec<File>>;
    /// Deletes one file and returns the id of the removed row.
    fn delete_file(
        &self,
        tx: &Transaction<'_>,
        id: FileId,
        request_id: &str,
    ) -> StorageResult<FileId>;
}

/// SQLite-backed file repository. Holds no connection state.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteFileRepository;

impl SqliteFileRepository {
    pub fn new() -> Self {
        Self
    }
}

impl FileRepository for SqliteFileRepository {
    fn create_file(
        &self,
        tx: &Transaction<'_>,
        file: &NewFile,
        request_id: &str,
    ) -> StorageResult<FileId> {
        let trace = OpTrace::start(
            "file.create",
            request_id,
            format_args!("filename={:?} chunks_count={:?}", file.filename, file.chunks_count),
        );

        if let Err(violations) = file.validate() {
            return Err(trace.fail(StorageError::validation(format!(
                "failed to create new file: {violations}"
            ))));
        }
        let size = match file.size.map(i64::try_from).transpose() {
            Ok(size) => size,
            Err(_) => {
                return Err(trace.fail(StorageError::validation(
                    "failed to create new file: size is out of range",
                )))
            }
        };

        let inserted = tx.query_row(
            "INSERT INTO file (filename, size, name, chunks_count)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id;",
            params![
                file.filename.as_deref(),
                size,
                file.name.as_deref(),
                file.chunks_count,
            ],
            |row| row.get::<_, FileId>(0),
        );

        match inserted {
            Ok(id) => {
                trace.ok(format_args!("id={id}"));
                Ok(id)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(trace.fail(StorageError::internal(
                "no rows returned when creating new file",
            ))),
            Err(err) => Err(trace.fail(StorageError::from_sqlite(
                "failed to create new file",
                err,
            ))),
        }
    }

    fn get_file_by_id(
        &self,
        tx: &Transaction<'_>,
        id: FileId,
        request_id: &str,
    ) -> StorageResult<File> {
        let trace = OpTrace::start("file.get_by_id", request_id, format_args!("id={id}"));

        let fetched = tx.query_row(
            &format!("{FILE_SELECT_SQL} WHERE id = ?1;"),
            [id],
            parse_file_row,
        );

        match fetched {
            Ok(file) => {
                trace.ok(format_args!("id={}", file.id));
                Ok(file)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(trace.fail(StorageError::not_found("file not found")))
            }
            Err(err) => Err(trace.fail(StorageError::from_sqlite("failed to get file by id", err))),
        }
    }

    fn search_files(
        &self,
        tx: &Transaction<'_>,
        query: &str,
        request_id: &str,
    ) -> StorageResult<Vec<File>> {
        let trace = OpTrace::start("file.search", request_id, format_args!("query={query:?}"));

        let files = match run_search(tx, &like_pattern(query)) {
            Ok(files) => files,
            Err(err) => {
                return Err(trace.fail(StorageError::from_sqlite("failed to search files", err)))
            }
        };

        if files.is_empty() {
            return Err(trace.fail(StorageError::not_found("files not found")));
        }

        trace.ok(format_args!("count={}", files.len()));
        Ok(files)
    }

    fn delete_file(
        &self,
        tx: &Transaction<'_>,
        id: FileId,
        request_id: &str,
    ) -> StorageResult<FileId> {
        let trace = OpTrace::start("file.delete", request_id, format_args!("id={id}"));

        let deleted = tx.query_row(
            "DELETE FROM file
             WHERE id = ?1
             RETURNING id;",
            [id],
            |row| row.get::<_, FileId>(0),
        );

        match deleted {
            Ok(deleted_id) => {
                trace.ok(format_args!("id={deleted_id}"));
                Ok(deleted_id)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(trace.fail(StorageError::not_found("file not found")))
            }
            Err(err) => Err(trace.fail(StorageError::from_sqlite("failed to delete file", err))),
        }
    }
}

fn run_search(tx: &Transaction<'_>, pattern: &str) -> rusqlite::Result<Vec<File>> {
    let mut stmt = tx.prepare(&format!(
        "{FILE_SELECT_SQL}
         WHERE LOWER(filename) LIKE ?1 ESCAPE '\\'
            OR LOWER(name) LIKE ?1 ESCAPE '\\'
         ORDER BY id ASC;"
    ))?;
    let mut rows = stmt.query([pattern])?;
    let mut files = Vec::new();
    while let Some(row) = rows.next()? {
        files.push(parse_file_row(row)?);
    }
    Ok(files)
}

/// Builds a `LIKE` pattern matching `query` literally as a lower-cased substring.
///
/// Folds ASCII only, the same as SQLite `LOWER`.
fn like_pattern(query: &str) -> String {
    let lowered = query.to_ascii_lowercase();
    let mut pattern = String::with_capacity(lowered.len() + 2);
    pattern.push('%');
    for ch in lowered.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn parse_file_row(row: &Row<'_>) -> rusqlite::Result<File> {
    let size: i64 = row.get("size")?;
    let size =
        u64::try_from(size).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(2, size))?;

    Ok(File {
        id: row.get("id")?,
        filename: row.get("filename")?,
        size,
        name: row.get("name")?,
        chunks_count: row.get("chunks_count")?,
    })
}
