//! Loan lifecycle and the single-active-loan rule
//!
//! This module provides the `LoanLedger`, which owns loan creation, lookup
//! and payment.
//!
//! # State Machine
//!
//! Each account moves independently between two states:
//!
//! ```text
//! NoLoan --request_loan--> HasLoan --pay_loan--> NoLoan
//! ```
//!
//! `request_loan` from `HasLoan` fails with `AlreadyHasLoan` and `pay_loan`
//! from `NoLoan` fails with `NoActiveLoan`. Neither is ever ignored.
//!
//! # Concurrency
//!
//! Exclusivity rests entirely on the store: `create_loan` is an atomic
//! create-if-absent and `delete_loan` an atomic delete-if-present. Two
//! concurrent requests for one account cannot both succeed, and a payment
//! that loses a race against another payment sees `NotFound` from the store,
//! reported as `NoActiveLoan`.

use crate::core::traits::{Clock, Store};
use crate::types::{AccountId, LoanServiceError, LoanView, PaymentConfirmation, StoreError};
use chrono::{DateTime, Months, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Due date for a loan requested at `requested_at`
///
/// Same calendar day one year later; 29 February falls due on 28 February.
pub fn due_date_from(requested_at: DateTime<Utc>) -> DateTime<Utc> {
    requested_at
        .checked_add_months(Months::new(12))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Loan creation, lookup and payment on top of a [`Store`]
#[derive(Clone)]
pub struct LoanLedger {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl LoanLedger {
    /// Create a ledger reading time from [`SystemClock`]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a ledger with a custom clock
    pub fn with_clock(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Open a loan for an account that has none
    ///
    /// # Arguments
    ///
    /// * `account_id` - Account requesting the loan
    /// * `amount` - Principal; must not be negative, no upper bound
    ///
    /// # Returns
    ///
    /// The new loan, due one year from now.
    ///
    /// # Errors
    ///
    /// * `LoanServiceError::InvalidAmount` if `amount` is negative
    /// * `LoanServiceError::AlreadyHasLoan` if the account already has a loan
    /// * `LoanServiceError::Unavailable` if the store failed
    pub async fn request_loan(
        &self,
        account_id: AccountId,
        amount: i64,
    ) -> Result<LoanView, LoanServiceError> {
        if amount < 0 {
            return Err(LoanServiceError::invalid_amount(amount));
        }

        let due_at = due_date_from(self.clock.now());

        match self.store.create_loan(account_id, amount, due_at).await {
            Ok(loan) => {
                info!(account_id, loan_id = loan.id, amount, %due_at, "loan opened");
                Ok(loan.into())
            }
            Err(StoreError::Conflict) => {
                debug!(account_id, "loan request rejected, loan already active");
                Err(LoanServiceError::already_has_loan(account_id))
            }
            Err(err) => Err(LoanServiceError::unavailable(err.to_string())),
        }
    }

    /// Current loan of an account
    ///
    /// # Errors
    ///
    /// * `LoanServiceError::NotFound` if the account has no loan
    /// * `LoanServiceError::Unavailable` if the store failed
    pub async fn check_status(&self, account_id: AccountId) -> Result<LoanView, LoanServiceError> {
        match self.store.find_loan_by_account_id(account_id).await {
            Ok(loan) => Ok(loan.into()),
            Err(StoreError::NotFound) => Err(LoanServiceError::loan_not_found()),
            Err(err) => Err(LoanServiceError::unavailable(err.to_string())),
        }
    }

    /// Pay off and remove the account's loan
    ///
    /// # Errors
    ///
    /// * `LoanServiceError::NoActiveLoan` if the account has no loan, or a
    ///   concurrent payment removed it first
    /// * `LoanServiceError::Unavailable` if the store failed
    pub async fn pay_loan(
        &self,
        account_id: AccountId,
    ) -> Result<PaymentConfirmation, LoanServiceError> {
        let loan = match self.store.find_loan_by_account_id(account_id).await {
            Ok(loan) => loan,
            Err(StoreError::NotFound) => return Err(LoanServiceError::no_active_loan(account_id)),
            Err(err) => return Err(LoanServiceError::unavailable(err.to_string())),
        };

        match self.store.delete_loan(loan.id).await {
            Ok(()) => {
                info!(account_id, loan_id = loan.id, "loan paid");
                Ok(PaymentConfirmation::paid(loan.id))
            }
            Err(StoreError::NotFound) => {
                debug!(account_id, loan_id = loan.id, "loan removed by a concurrent payment");
                Err(LoanServiceError::no_active_loan(account_id))
            }
            Err(err) => Err(LoanServiceError::unavailable(err.to_string())),
        }
    }
}
