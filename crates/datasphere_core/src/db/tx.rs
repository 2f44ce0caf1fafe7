//! Transaction and deadline helpers for callers of the repositories.
//!
//! Repositories never begin or finish transactions. These helpers exist
//! for orchestrators (and tests) that own the transaction lifecycle.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::{Duration, Instant};

/// VM instructions between deadline checks.
const DEADLINE_CHECK_INTERVAL: i32 = 1_000;

/// Intent of a business operation's transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Deferred: takes a shared lock on first read.
    Read,
    /// Immediate: takes the write lock up front so writers fail fast on
    /// contention instead of deadlocking on lock upgrade.
    Write,
}

/// Begins one transaction on `conn`.
pub fn begin(conn: &mut Connection, mode: TxMode) -> rusqlite::Result<Transaction<'_>> {
    let behavior = match mode {
        TxMode::Read => TransactionBehavior::Deferred,
        TxMode::Write => TransactionBehavior::Immediate,
    };
    conn.transaction_with_behavior(behavior)
}

/// Interrupts statements on a connection once a deadline passes.
///
/// Statements interrupted this way fail with `SQLITE_INTERRUPT`, which the
/// repositories report as an internal failure. Dropping the guard removes
/// the deadline.
pub struct Deadline<'conn> {
    conn: &'conn Connection,
    expires_at: Instant,
}

impl<'conn> Deadline<'conn> {
    /// Arms a deadline `timeout` from now on `conn`.
    ///
    /// A transaction derefs to its connection, so this can be armed on the
    /// transaction handed to the repositories.
    pub fn arm(conn: &'conn Connection, timeout: Duration) -> Self {
        let expires_at = Instant::now() + timeout;
        conn.progress_handler(
            DEADLINE_CHECK_INTERVAL,
            Some(move || Instant::now() >= expires_at),
        );
        Self { conn, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

impl Drop for Deadline<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}
