//! Account identity and credential verification
//!
//! This module provides the `AccountDirectory`, which owns registration and
//! login. Name uniqueness is delegated to the store's atomic
//! `create_account`; the directory never checks for an existing name before
//! inserting.

use crate::core::traits::{CredentialVerifier, Store};
use crate::types::{AccountView, LoanServiceError, StoreError};
use std::sync::Arc;
use tracing::{debug, info};

/// Exact string comparison of secrets
///
/// The default verifier. Credentials are stored as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextVerifier;

impl CredentialVerifier for PlaintextVerifier {
    fn verify(&self, secret: &str, stored: &str) -> bool {
        secret == stored
    }
}

/// Registration and login on top of a [`Store`]
#[derive(Clone)]
pub struct AccountDirectory {
    store: Arc<dyn Store>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AccountDirectory {
    /// Create a directory using [`PlaintextVerifier`]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_verifier(store, Arc::new(PlaintextVerifier))
    }

    /// Create a directory with a custom credential verifier
    pub fn with_verifier(store: Arc<dyn Store>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Register a new account
    ///
    /// # Arguments
    ///
    /// * `name` - Display name; must be non-empty and not already taken
    /// * `secret` - Credential secret, stored opaquely
    ///
    /// # Returns
    ///
    /// The new account's identifier and name. The secret is never returned.
    ///
    /// # Errors
    ///
    /// * `LoanServiceError::InvalidName` if `name` is empty
    /// * `LoanServiceError::AlreadyExists` if `name` is taken
    /// * `LoanServiceError::Unavailable` if the store failed
    pub async fn register(&self, name: &str, secret: &str) -> Result<AccountView, LoanServiceError> {
        if name.is_empty() {
            return Err(LoanServiceError::InvalidName);
        }

        match self.store.create_account(name, secret).await {
            Ok(account) => {
                info!(account_id = account.id, name, "account registered");
                Ok(account.into())
            }
            Err(StoreError::Conflict) => {
                debug!(name, "registration rejected, name taken");
                Err(LoanServiceError::already_exists(name))
            }
            Err(err) => Err(LoanServiceError::unavailable(err.to_string())),
        }
    }

    /// Authenticate an account by name and secret
    ///
    /// Pure read: nothing is written on success or failure.
    ///
    /// # Errors
    ///
    /// * `LoanServiceError::NotFound` if no account has that name
    /// * `LoanServiceError::InvalidCredentials` if the secret does not match
    /// * `LoanServiceError::Unavailable` if the store failed
    pub async fn login(&self, name: &str, secret: &str) -> Result<AccountView, LoanServiceError> {
        let account = match self.store.find_account_by_name(name).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(LoanServiceError::account_not_found()),
            Err(err) => return Err(LoanServiceError::unavailable(err.to_string())),
        };

        if !self.verifier.verify(secret, &account.secret) {
            debug!(account_id = account.id, "login rejected, bad credentials");
            return Err(LoanServiceError::InvalidCredentials);
        }

        Ok(account.into())
    }
}
