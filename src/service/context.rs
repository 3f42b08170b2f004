//! Per-call deadline and cancellation
//!
//! The request dispatcher hands every facade call a [`CallContext`]. The
//! in-flight work is raced against the caller's cancellation token and
//! deadline; whichever finishes first decides the outcome. Losing the race
//! drops the work future. Stores see that drop: the SQLite store rolls back a
//! write whose caller is gone instead of committing it, and the in-memory
//! store never suspends inside a write.

use crate::types::LoanServiceError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation token for one facade call
#[derive(Clone, Debug)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl CallContext {
    /// Context with no deadline and a token nobody else holds
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Context that expires `timeout` from now or when `cancel` fires
    pub fn with_timeout(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel,
        }
    }

    /// Token that cancels this call
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drive `work` until it completes, the deadline passes or the call is
    /// cancelled
    ///
    /// Cancellation is checked first, so an already-cancelled context never
    /// starts the work.
    ///
    /// # Errors
    ///
    /// * `LoanServiceError::Cancelled` if the token fires first
    /// * `LoanServiceError::DeadlineExceeded` if the deadline passes first
    /// * whatever `work` returns otherwise
    pub async fn run<T, F>(&self, work: F) -> Result<T, LoanServiceError>
    where
        F: Future<Output = Result<T, LoanServiceError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LoanServiceError::Cancelled),
            _ = deadline => Err(LoanServiceError::DeadlineExceeded),
            result = work => result,
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}
