//! Chunk repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Insert `chunk` rows owned by an existing file.
//! - Return chunk pages ordered by `chunk_number` with the file's total count.
//!
//! # Invariants
//! - A chunk whose `file_key` names no file is rejected by the foreign key
//!   and reported as a validation failure.
//! - The total count covers every chunk of the file regardless of the page.
//! - A file with no chunks and an unknown file key are both `NotFound`.

use super::OpTrace;
use crate::error::{StorageError, StorageResult};
use crate::model::chunk::{Chunk, ChunkId, FileChunks, NewChunk};
use crate::model::file::FileId;
use rusqlite::{params, Row, Transaction};

/// Transaction-scoped access to `Chunk` rows.
pub trait ChunkRepository {
    /// Inserts a chunk and returns its store-assigned id.
    fn create_chunk(
        &self,
        tx: &Transaction<'_>,
        chunk: &NewChunk,
        request_id: &str,
    ) -> StorageResult<ChunkId>;

    /// Returns up to `limit` chunks of `file_key` starting at `offset`,
    /// ordered by `chunk_number`, together with the file's total chunk count.
    fn list_file_chunks(
        &self,
        tx: &Transaction<'_>,
        file_key: FileId,
        limit: u32,
        offset: u32,
        request_id: &str,
    ) -> StorageResult<FileChunks>;
}

/// SQLite-backed chunk repository. Holds no connection state.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteChunkRepository;

impl SqliteChunkRepository {
    pub fn new() -> Self {
        Self
    }
}

impl ChunkRepository for SqliteChunkRepository {
    fn create_chunk(
        &self,
        tx: &Transaction<'_>,
        chunk: &NewChunk,
        request_id: &str,
    ) -> StorageResult<ChunkId> {
        let trace = OpTrace::start(
            "chunk.create",
            request_id,
            format_args!(
                "file_key={:?} chunk_number={:?}",
                chunk.file_key, chunk.chunk_number
            ),
        );

        if let Err(violations) = chunk.validate() {
            return Err(trace.fail(StorageError::validation(format!(
                "failed to create new chunk: {violations}"
            ))));
        }

        let inserted = tx.query_row(
            "INSERT INTO chunk (file_id, chunk_number, file_key)
             VALUES (?1, ?2, ?3)
             RETURNING id;",
            params![chunk.file_id.as_deref(), chunk.chunk_number, chunk.file_key],
            |row| row.get::<_, ChunkId>(0),
        );

        match inserted {
            Ok(id) => {
                trace.ok(format_args!("id={id}"));
                Ok(id)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(trace.fail(StorageError::internal(
                "no rows returned when creating new chunk",
            ))),
            Err(err) => Err(trace.fail(StorageError::from_sqlite(
                "failed to create new chunk",
                err,
            ))),
        }
    }

    fn list_file_chunks(
        &self,
        tx: &Transaction<'_>,
        file_key: FileId,
        limit: u32,
        offset: u32,
        request_id: &str,
    ) -> StorageResult<FileChunks> {
        let trace = OpTrace::start(
            "chunk.list_by_file",
            request_id,
            format_args!("file_key={file_key} limit={limit} offset={offset}"),
        );

        if limit == 0 {
            return Err(trace.fail(StorageError::validation(
                "failed to get file chunks: limit must be positive",
            )));
        }

        let count = match count_file_chunks(tx, file_key) {
            Ok(count) => count,
            Err(err) => {
                return Err(trace.fail(StorageError::from_sqlite(
                    "failed to get file chunks count",
                    err,
                )))
            }
        };
        if count == 0 {
            return Err(trace.fail(StorageError::not_found("file chunks not found")));
        }

        let chunks = match load_chunk_page(tx, file_key, limit, offset) {
            Ok(chunks) => chunks,
            Err(err) => {
                return Err(trace.fail(StorageError::from_sqlite(
                    "failed to get file chunks",
                    err,
                )))
            }
        };
        if chunks.is_empty() {
            return Err(trace.fail(StorageError::not_found("file chunks not found")));
        }

        trace.ok(format_args!("count={count} page_len={}", chunks.len()));
        Ok(FileChunks { count, chunks })
    }
}

fn count_file_chunks(tx: &Transaction<'_>, file_key: FileId) -> rusqlite::Result<u64> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*)
         FROM chunk
         WHERE file_key = ?1;",
        [file_key],
        |row| row.get(0),
    )?;
    u64::try_from(count).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, count))
}

fn load_chunk_page(
    tx: &Transaction<'_>,
    file_key: FileId,
    limit: u32,
    offset: u32,
) -> rusqlite::Result<Vec<Chunk>> {
    let mut stmt = tx.prepare(
        "SELECT
            id,
            file_id,
            chunk_number,
            file_key
         FROM chunk
         WHERE file_key = ?1
         ORDER BY chunk_number ASC, id ASC
         LIMIT ?2 OFFSET ?3;",
    )?;
    let mut rows = stmt.query(params![file_key, limit, offset])?;
    let mut chunks = Vec::new();
    while let Some(row) = rows.next()? {
        chunks.push(parse_chunk_row(row)?);
    }
    Ok(chunks)
}

fn parse_chunk_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        id: row.get("id")?,
        file_id: row.get("file_id")?,
        chunk_number: row.get("chunk_number")?,
        file_key: row.get("file_key")?,
    })
}
