//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define transaction-scoped data access contracts for files and chunks.
//! - Isolate SQLite query details from orchestration code.
//!
//! # Invariants
//! - Repositories run only inside a caller-supplied transaction; they never
//!   begin, commit or roll back.
//! - Write paths validate inputs before SQL mutations.
//! - Every failure is a classified `StorageError`.
//! - Every operation logs its request id for correlation; the id never
//!   influences results.

use crate::error::{ErrorKind, StorageError};
use log::{debug, error, warn};
use std::fmt::Arguments;
use std::time::Instant;

pub mod chunk_repo;
pub mod file_repo;

/// Start/ok/error event emitter for one repository call.
struct OpTrace<'a> {
    op: &'static str,
    request_id: &'a str,
    started_at: Instant,
}

impl<'a> OpTrace<'a> {
    fn start(op: &'static str, request_id: &'a str, details: Arguments<'_>) -> Self {
        debug!(
            "event=storage_op module=storage op={op} request_id={request_id} status=start {details}"
        );
        Self {
            op,
            request_id,
            started_at: Instant::now(),
        }
    }

    fn ok(&self, details: Arguments<'_>) {
        debug!(
            "event=storage_op module=storage op={} request_id={} status=ok duration_ms={} {details}",
            self.op,
            self.request_id,
            self.started_at.elapsed().as_millis()
        );
    }

    fn fail(&self, err: StorageError) -> StorageError {
        let duration_ms = self.started_at.elapsed().as_millis();
        match err.kind() {
            ErrorKind::Internal => error!(
                "event=storage_op module=storage op={} request_id={} status=error duration_ms={duration_ms} error_kind={} error={}",
                self.op,
                self.request_id,
                err.kind(),
                err
            ),
            ErrorKind::Validation | ErrorKind::NotFound => warn!(
                "event=storage_op module=storage op={} request_id={} status=error duration_ms={duration_ms} error_kind={} error={}",
                self.op,
                self.request_id,
                err.kind(),
                err
            ),
        }
        err
    }
}
