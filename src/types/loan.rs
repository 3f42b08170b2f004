//! Loan-related types for the loan service
//!
//! This module defines the stored Loan record, the view returned to callers
//! and the confirmation produced when a loan is paid off.

use super::account::AccountId;
use chrono::{DateTime, Utc};

/// Loan identifier
pub type LoanId = i64;

/// Message returned to the caller once a loan has been paid off
pub const LOAN_PAID_MESSAGE: &str = "Loan payed";

/// Outstanding loan as persisted by the store
///
/// At most one Loan exists per account. A Loan is created whole and
/// destroyed whole: there is no partial payment and no amount change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    /// Store-assigned identifier
    pub id: LoanId,

    /// Account that owes this loan
    ///
    /// A reference, not ownership: the store has no foreign-key semantics.
    pub account_id: AccountId,

    /// Principal amount, never negative
    pub amount: i64,

    /// Absolute instant the loan falls due
    pub due_at: DateTime<Utc>,
}

/// Caller-facing projection of a loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanView {
    pub id: LoanId,
    pub amount: i64,
    pub due_at: DateTime<Utc>,
}

impl From<Loan> for LoanView {
    fn from(loan: Loan) -> Self {
        LoanView {
            id: loan.id,
            amount: loan.amount,
            due_at: loan.due_at,
        }
    }
}

/// Result of paying off a loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Identifier of the loan that was removed
    pub loan_id: LoanId,

    /// Human-readable confirmation
    pub message: String,
}

impl PaymentConfirmation {
    /// Confirmation for a loan that has just been deleted
    pub fn paid(loan_id: LoanId) -> Self {
        PaymentConfirmation {
            loan_id,
            message: LOAN_PAID_MESSAGE.to_string(),
        }
    }
}
