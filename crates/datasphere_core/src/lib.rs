//! Transactional metadata store for files split into externally stored chunks.
//!
//! The store records which chunks belong to which file and in what order. It
//! never moves chunk bytes. Every repository call runs inside a transaction
//! owned by the caller, so a file and its chunks can be registered or
//! removed as one unit.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod storage;

pub use config::{Config, ConfigError};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use logging::{init_logging, logging_status, new_request_id, LogMode};
pub use model::chunk::{Chunk, ChunkId, FileChunks, NewChunk};
pub use model::file::{File, FileId, NewFile};
pub use model::validation::{FieldViolation, ValidationErrors, ViolationReason};
pub use repo::chunk_repo::{ChunkRepository, SqliteChunkRepository};
pub use repo::file_repo::{FileRepository, SqliteFileRepository};
pub use storage::Storage;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
