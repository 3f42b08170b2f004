//! Error types for the loan service
//!
//! This module defines the two error enums of the service.
//!
//! # Error Categories
//!
//! - **Store errors** ([`StoreError`]): what the persistence seam can report.
//!   Uniqueness violations surface as `Conflict`, missing rows as `NotFound`,
//!   and anything the backend could not complete as `Unavailable`.
//! - **Service errors** ([`LoanServiceError`]): what the Account Directory,
//!   Loan Ledger and Service Facade report. Business-rule variants display
//!   exactly the protocol error strings sent to remote callers.

use super::account::AccountId;
use thiserror::Error;

/// Errors reported by a [`Store`](crate::core::Store) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The requested record does not exist
    #[error("record not found")]
    NotFound,

    /// A create would violate a uniqueness rule
    ///
    /// Returned by create-if-absent primitives when the record already exists.
    #[error("record already exists")]
    Conflict,

    /// The backend could not complete the operation
    ///
    /// Connection loss, an aborted transaction or a lock that did not clear
    /// within the retry budget.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Description of the underlying failure
        message: String,
    },
}

impl StoreError {
    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}

/// Main error type for the loan service
///
/// Every variant except `Unavailable`, `IdOutOfRange`, `DeadlineExceeded`
/// and `Cancelled` is a business-rule violation and is surfaced verbatim to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoanServiceError {
    /// The named entity does not exist
    #[error("{entity} not found")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
    },

    /// Registration attempted with a name that is already taken
    #[error("username already exists")]
    AlreadyExists {
        /// The name that collided
        name: String,
    },

    /// The supplied secret does not match the stored one
    #[error("invalid username/password")]
    InvalidCredentials,

    /// A loan was requested for an account that already has one
    #[error("user already has an active loan")]
    AlreadyHasLoan {
        /// Account holding the existing loan
        account: AccountId,
    },

    /// A payment was attempted for an account with no loan
    #[error("no loan registered for current user")]
    NoActiveLoan {
        /// Account that has nothing to pay
        account: AccountId,
    },

    /// A loan was requested with a negative amount
    #[error("invalid loan amount {amount}: must not be negative")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Registration attempted with an empty name
    #[error("username must not be empty")]
    InvalidName,

    /// The store is unreachable or aborted the operation
    #[error("service unavailable: {message}")]
    Unavailable {
        /// Description of the storage failure
        message: String,
    },

    /// A stored identifier does not fit the 32-bit wire format
    #[error("identifier {id} does not fit the wire format")]
    IdOutOfRange {
        /// The stored identifier
        id: i64,
    },

    /// The caller's deadline elapsed before the operation finished
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The caller cancelled the operation
    #[error("request cancelled")]
    Cancelled,
}

impl LoanServiceError {
    /// Create a NotFound error for an account
    pub fn account_not_found() -> Self {
        LoanServiceError::NotFound { entity: "account" }
    }

    /// Create a NotFound error for a loan
    pub fn loan_not_found() -> Self {
        LoanServiceError::NotFound { entity: "loan" }
    }

    /// Create an AlreadyExists error
    pub fn already_exists(name: &str) -> Self {
        LoanServiceError::AlreadyExists {
            name: name.to_string(),
        }
    }

    /// Create an AlreadyHasLoan error
    pub fn already_has_loan(account: AccountId) -> Self {
        LoanServiceError::AlreadyHasLoan { account }
    }

    /// Create a NoActiveLoan error
    pub fn no_active_loan(account: AccountId) -> Self {
        LoanServiceError::NoActiveLoan { account }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: i64) -> Self {
        LoanServiceError::InvalidAmount { amount }
    }

    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        LoanServiceError::Unavailable {
            message: message.into(),
        }
    }

    /// Whether this error is a business-rule rejection rather than a failure
    /// of the service itself
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            LoanServiceError::Unavailable { .. }
                | LoanServiceError::IdOutOfRange { .. }
                | LoanServiceError::DeadlineExceeded
                | LoanServiceError::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::already_exists(
        LoanServiceError::already_exists("bob"),
        "username already exists"
    )]
    #[case::invalid_credentials(
        LoanServiceError::InvalidCredentials,
        "invalid username/password"
    )]
    #[case::already_has_loan(
        LoanServiceError::already_has_loan(3),
        "user already has an active loan"
    )]
    #[case::no_active_loan(
        LoanServiceError::no_active_loan(3),
        "no loan registered for current user"
    )]
    #[case::account_not_found(LoanServiceError::account_not_found(), "account not found")]
    #[case::invalid_amount(
        LoanServiceError::invalid_amount(-5),
        "invalid loan amount -5: must not be negative"
    )]
    #[case::unavailable(
        LoanServiceError::unavailable("database is locked"),
        "service unavailable: database is locked"
    )]
    #[case::id_out_of_range(
        LoanServiceError::IdOutOfRange { id: 1 << 40 },
        "identifier 1099511627776 does not fit the wire format"
    )]
    fn test_error_display(#[case] error: LoanServiceError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::not_found(StoreError::NotFound, "record not found")]
    #[case::conflict(StoreError::Conflict, "record already exists")]
    #[case::unavailable(StoreError::unavailable("disk I/O error"), "storage unavailable: disk I/O error")]
    fn test_store_error_display(#[case] error: StoreError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::invalid_credentials(LoanServiceError::InvalidCredentials, true)]
    #[case::no_active_loan(LoanServiceError::no_active_loan(1), true)]
    #[case::unavailable(LoanServiceError::unavailable("down"), false)]
    #[case::id_out_of_range(LoanServiceError::IdOutOfRange { id: 1 << 40 }, false)]
    #[case::deadline(LoanServiceError::DeadlineExceeded, false)]
    #[case::cancelled(LoanServiceError::Cancelled, false)]
    fn test_is_rejection(#[case] error: LoanServiceError, #[case] expected: bool) {
        assert_eq!(error.is_rejection(), expected);
    }
}
