//! Core traits for persistence, credential checking and time
//!
//! This module defines the seams of the service: the [`Store`] capability the
//! Account Directory and Loan Ledger are built on, the [`CredentialVerifier`]
//! used at login, and the [`Clock`] the ledger reads due dates from.

use crate::types::{Account, AccountId, Loan, LoanId, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistent mapping of accounts and loans
///
/// Every operation that combines a lookup with a mutation is a single atomic
/// primitive: implementations must never expose create-if-absent or
/// delete-if-present as a read followed by a separate write. Reads always
/// reflect the latest committed state; implementations do not cache.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up an account by its exact (case-sensitive) name
    ///
    /// # Errors
    ///
    /// * `StoreError::NotFound` if no account has that name
    async fn find_account_by_name(&self, name: &str) -> Result<Account, StoreError>;

    /// Create an account, assigning it a fresh identifier
    ///
    /// # Errors
    ///
    /// * `StoreError::Conflict` if the name is already taken
    async fn create_account(&self, name: &str, secret: &str) -> Result<Account, StoreError>;

    /// Look up the loan owned by an account
    ///
    /// # Errors
    ///
    /// * `StoreError::NotFound` if the account has no loan
    async fn find_loan_by_account_id(&self, account_id: AccountId) -> Result<Loan, StoreError>;

    /// Create a loan for an account that has none
    ///
    /// # Errors
    ///
    /// * `StoreError::Conflict` if the account already has a loan
    async fn create_loan(
        &self,
        account_id: AccountId,
        amount: i64,
        due_at: DateTime<Utc>,
    ) -> Result<Loan, StoreError>;

    /// Delete a loan by identifier
    ///
    /// # Errors
    ///
    /// * `StoreError::NotFound` if no loan has that identifier
    async fn delete_loan(&self, loan_id: LoanId) -> Result<(), StoreError>;
}

/// Credential comparison used by the Account Directory
///
/// Keeping this abstract lets a hashing scheme replace the default without
/// touching the directory's interface.
pub trait CredentialVerifier: Send + Sync {
    /// Whether `secret` matches the `stored` credential
    fn verify(&self, secret: &str, stored: &str) -> bool;
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
