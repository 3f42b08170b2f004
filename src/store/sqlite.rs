//! SQLite-backed durable store
//!
//! This module provides the `SqliteStore` struct, the production [`Store`].
//!
//! # Atomicity
//!
//! Uniqueness is enforced by the schema: `accounts.name` and
//! `loans.account_id` are `UNIQUE`. Every mutation is a single statement run
//! inside an `IMMEDIATE` transaction, so create-if-absent is "insert, and let
//! the constraint reject a duplicate", and delete-if-present is "delete, and
//! count the affected rows". No mutation is preceded by a separate existence
//! check.
//!
//! # Blocking
//!
//! `rusqlite` is synchronous. Each operation runs on the blocking pool via
//! `tokio::task::spawn_blocking`, holding the connection mutex only for the
//! duration of that one operation.
//!
//! # Abandoned calls
//!
//! A caller that stops waiting (deadline passed, call cancelled) drops the
//! operation future, but the blocking closure cannot be dropped with it. The
//! future therefore carries a drop guard that marks the call abandoned. The
//! closure checks the mark once it holds the connection and again right
//! before committing, so an abandoned write rolls back instead of landing
//! behind the caller's back.
//!
//! # Retries
//!
//! A busy or locked database is retried according to the store's
//! [`RetryPolicy`]; when the budget is spent the caller gets
//! `StoreError::Unavailable`. The connection's own busy timeout is disabled
//! so the policy is the only waiting that happens.

use super::RetryPolicy;
use crate::core::Store;
use crate::types::{Account, AccountId, Loan, LoanId, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        secret TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS loans (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL UNIQUE,
        amount INTEGER NOT NULL CHECK (amount >= 0),
        due_at TEXT NOT NULL
    );
";

type SqlResult<T> = Result<T, rusqlite::Error>;

/// Whether the caller of an operation is still waiting for it
#[derive(Clone, Debug)]
struct CallLiveness(Arc<AtomicBool>);

impl CallLiveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    fn abandon(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Fail with `SQLITE_INTERRUPT` once the caller is gone
    fn ensure_live(&self) -> SqlResult<()> {
        if self.0.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
                Some("caller stopped waiting".to_string()),
            ))
        }
    }
}

/// Marks the call abandoned when the operation future is dropped
struct AbandonOnDrop(CallLiveness);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.abandon();
    }
}

/// Durable store on a single SQLite database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    retry: RetryPolicy,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    ///
    /// Enables WAL journaling and creates the tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the file cannot be opened or the
    /// schema cannot be applied.
    pub fn open(path: impl AsRef<Path>, retry: RetryPolicy) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self::from_connection(conn, retry)?;
        info!(path = %path.display(), "sqlite store opened");
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, RetryPolicy::default())
    }

    fn from_connection(conn: Connection, retry: RetryPolicy) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::ZERO)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            retry,
        })
    }

    /// Number of loans currently stored
    pub async fn loan_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .run("loan_count", |conn, _| {
                conn.query_row("SELECT COUNT(*) FROM loans", [], |row| row.get(0))
            })
            .await??;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Run `f` against the connection on the blocking pool, retrying
    /// transient failures
    ///
    /// `f` gets the call's liveness and must check it before committing a
    /// write. It is also checked here before `f` starts.
    ///
    /// The outer result carries failures of the machinery itself (a poisoned
    /// mutex, a panicked task, an exhausted retry budget). The inner result is
    /// the SQL outcome, left for the caller to map since only the caller knows
    /// what a constraint violation means.
    async fn run<T, F>(&self, operation: &'static str, f: F) -> Result<SqlResult<T>, StoreError>
    where
        T: Send + 'static,
        F: Fn(&mut Connection, &CallLiveness) -> SqlResult<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let call = CallLiveness::new();
        let _abandon_on_drop = AbandonOnDrop(call.clone());
        let mut attempt = 0;

        loop {
            attempt += 1;
            let conn = Arc::clone(&self.conn);
            let op = Arc::clone(&f);
            let call = call.clone();

            let outcome = tokio::task::spawn_blocking(move || {
                let mut guard = conn
                    .lock()
                    .map_err(|_| StoreError::unavailable("connection mutex poisoned"))?;
                Ok::<_, StoreError>(call.ensure_live().and_then(|()| op(&mut *guard, &call)))
            })
            .await
            .map_err(|e| StoreError::unavailable(format!("storage task failed: {e}")))??;

            match outcome {
                Err(err) if is_transient(&err) => {
                    if !self.retry.should_retry(attempt) {
                        warn!(operation, attempts = attempt, error = %err, "storage busy, giving up");
                        return Err(StoreError::unavailable(err.to_string()));
                    }
                    let delay = self.retry.delay_for(attempt);
                    debug!(operation, attempt, ?delay, "storage busy, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return Ok(other),
            }
        }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_account_by_name(&self, name: &str) -> Result<Account, StoreError> {
        let name = name.to_string();
        self.run("find_account_by_name", move |conn, _| {
            let mut stmt =
                conn.prepare_cached("SELECT id, name, secret FROM accounts WHERE name = ?1")?;
            let account = stmt.query_row([&name], account_from_row).optional()?;
            Ok(account)
        })
        .await??
        .ok_or(StoreError::NotFound)
    }

    async fn create_account(&self, name: &str, secret: &str) -> Result<Account, StoreError> {
        let name = name.to_string();
        let secret = secret.to_string();
        self.run("create_account", move |conn, call| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO accounts (name, secret) VALUES (?1, ?2)",
                params![name, secret],
            )?;
            let id = tx.last_insert_rowid();
            call.ensure_live()?;
            tx.commit()?;
            Ok(Account {
                id,
                name: name.clone(),
                secret: secret.clone(),
            })
        })
        .await?
        .map_err(conflict_on_unique)
    }

    async fn find_loan_by_account_id(&self, account_id: AccountId) -> Result<Loan, StoreError> {
        self.run("find_loan_by_account_id", move |conn, _| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, account_id, amount, due_at FROM loans WHERE account_id = ?1",
            )?;
            let loan = stmt.query_row([account_id], loan_from_row).optional()?;
            Ok(loan)
        })
        .await??
        .ok_or(StoreError::NotFound)
    }

    async fn create_loan(
        &self,
        account_id: AccountId,
        amount: i64,
        due_at: DateTime<Utc>,
    ) -> Result<Loan, StoreError> {
        self.run("create_loan", move |conn, call| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO loans (account_id, amount, due_at) VALUES (?1, ?2, ?3)",
                params![account_id, amount, due_at],
            )?;
            let id = tx.last_insert_rowid();
            call.ensure_live()?;
            tx.commit()?;
            Ok(Loan {
                id,
                account_id,
                amount,
                due_at,
            })
        })
        .await?
        .map_err(conflict_on_unique)
    }

    async fn delete_loan(&self, loan_id: LoanId) -> Result<(), StoreError> {
        let deleted = self
            .run("delete_loan", move |conn, call| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let changed = tx.execute("DELETE FROM loans WHERE id = ?1", [loan_id])?;
                call.ensure_live()?;
                tx.commit()?;
                Ok(changed)
            })
            .await??;

        if deleted == 0 {
            Err(StoreError::NotFound)
        } else {
            Ok(())
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::unavailable(error.to_string())
    }
}

fn account_from_row(row: &Row<'_>) -> SqlResult<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        secret: row.get(2)?,
    })
}

fn loan_from_row(row: &Row<'_>) -> SqlResult<Loan> {
    Ok(Loan {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        due_at: row.get(3)?,
    })
}

fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn conflict_on_unique(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::Conflict
        }
        _ => err.into(),
    }
}
