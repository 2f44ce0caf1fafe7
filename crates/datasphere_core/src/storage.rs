//! Storage facade composing the file and chunk repositories.
//!
//! # Responsibility
//! - Offer one capability object, built once per process and shared by all
//!   callers, that forwards to the file and chunk repositories.
//!
//! # Invariants
//! - Holds no transaction state; every call takes the active transaction,
//!   so several calls can share one all-or-nothing unit of work.

use crate::db::migrations::MigrationSet;
use crate::db::{ensure_connection_ready, ensure_connection_ready_with, DbResult};
use crate::error::StorageResult;
use crate::model::chunk::{ChunkId, FileChunks, NewChunk};
use crate::model::file::{File, FileId, NewFile};
use crate::repo::chunk_repo::{ChunkRepository, SqliteChunkRepository};
use crate::repo::file_repo::{FileRepository, SqliteFileRepository};
use rusqlite::{Connection, Transaction};

/// File and chunk repositories behind one surface.
#[derive(Debug, Default, Clone)]
pub struct Storage<F = SqliteFileRepository, C = SqliteChunkRepository> {
    files: F,
    chunks: C,
}

impl Storage {
    /// Builds the SQLite-backed facade.
    pub fn new() -> Self {
        Self::with_repositories(SqliteFileRepository::new(), SqliteChunkRepository::new())
    }

    /// Builds the SQLite-backed facade after checking that `conn` has foreign
    /// keys enabled and the current schema applied.
    pub fn try_new(conn: &Connection) -> DbResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self::new())
    }

    /// Like [`Storage::try_new`] for databases migrated from `migrations`
    /// rather than the embedded set.
    pub fn try_new_with(conn: &Connection, migrations: &MigrationSet) -> DbResult<Self> {
        ensure_connection_ready_with(conn, migrations)?;
        Ok(Self::new())
    }
}

impl<F: FileRepository, C: ChunkRepository> Storage<F, C> {
    /// Composes independently constructed repositories.
    pub fn with_repositories(files: F, chunks: C) -> Self {
        Self { files, chunks }
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    pub fn chunks(&self) -> &C {
        &self.chunks
    }

    pub fn create_file(
        &self,
        tx: &Transaction<'_>,
        file: &NewFile,
        request_id: &str,
    ) -> StorageResult<FileId> {
        self.files.create_file(tx, file, request_id)
    }

    pub fn get_file_by_id(
        &self,
        tx: &Transaction<'_>,
        id: FileId,
        request_id: &str,
    ) -> StorageResult<File> {
        self.files.get_file_by_id(tx, id, request_id)
    }

    pub fn search_files(
        &self,
        tx: &Transaction<'_>,
        query: &str,
        request_id: &str,
    ) -> StorageResult<Vec<File>> {
        self.files.search_files(tx, query, request_id)
    }

    pub fn delete_file(
        &self,
        tx: &Transaction<'_>,
        id: FileId,
        request_id: &str,
    ) -> StorageResult<FileId> {
        self.files.delete_file(tx, id, request_id)
    }

    pub fn create_chunk(
        &self,
        tx: &Transaction<'_>,
        chunk: &NewChunk,
        request_id: &str,
    ) -> StorageResult<ChunkId> {
        self.chunks.create_chunk(tx, chunk, request_id)
    }

    pub fn list_file_chunks(
        &self,
        tx: &Transaction<'_>,
        file_key: FileId,
        limit: u32,
        offset: u32,
        request_id: &str,
    ) -> StorageResult<FileChunks> {
        self.chunks
            .list_file_chunks(tx, file_key, limit, offset, request_id)
    }
}
