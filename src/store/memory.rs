//! In-process store backed by concurrent maps
//!
//! This module provides the `MemoryStore` struct, which keeps accounts and
//! loans in `DashMap`s. It is not durable and exists for tests and for running
//! the service without a database file.
//!
//! # Atomicity
//!
//! Create-if-absent primitives go through the `DashMap` entry API: the shard
//! holding the key stays locked from the existence check to the insert, so two
//! concurrent creates for the same name (or the same account's loan) can never
//! both observe a vacant slot.
//!
//! Loans are indexed twice: by loan id, and by owning account in
//! `loan_owners`. The owner index is the exclusivity lock and the source of
//! truth for lookups by account. A loan is inserted by id while the owner
//! entry is held. A delete releases the owner slot first, only if it still
//! points at that loan, and then drops the row, so a lookup that misses the
//! loan always finds the account free.

use crate::core::Store;
use crate::types::{Account, AccountId, Loan, LoanId, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Non-durable store for tests and `--store memory`
#[derive(Debug)]
pub struct MemoryStore {
    /// Accounts keyed by their unique name
    accounts: DashMap<String, Account>,

    /// Loans keyed by loan id
    loans: DashMap<LoanId, Loan>,

    /// Loan id owned by each account; at most one entry per account
    loan_owners: DashMap<AccountId, LoanId>,

    next_account_id: AtomicI64,
    next_loan_id: AtomicI64,
}

impl MemoryStore {
    /// Create a new empty MemoryStore
    ///
    /// Identifiers start at 1, like an auto-increment column.
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            loans: DashMap::new(),
            loan_owners: DashMap::new(),
            next_account_id: AtomicI64::new(1),
            next_loan_id: AtomicI64::new(1),
        }
    }

    /// Number of loans currently stored
    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_account_by_name(&self, name: &str) -> Result<Account, StoreError> {
        self.accounts
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn create_account(&self, name: &str, secret: &str) -> Result<Account, StoreError> {
        match self.accounts.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                let account = Account {
                    id: self.next_account_id.fetch_add(1, Ordering::Relaxed),
                    name: name.to_string(),
                    secret: secret.to_string(),
                };
                slot.insert(account.clone());
                Ok(account)
            }
        }
    }

    async fn find_loan_by_account_id(&self, account_id: AccountId) -> Result<Loan, StoreError> {
        // Copy the id out so the owner guard is released before the second lookup
        let loan_id = self
            .loan_owners
            .get(&account_id)
            .map(|entry| *entry.value())
            .ok_or(StoreError::NotFound)?;

        self.loans
            .get(&loan_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn create_loan(
        &self,
        account_id: AccountId,
        amount: i64,
        due_at: DateTime<Utc>,
    ) -> Result<Loan, StoreError> {
        match self.loan_owners.entry(account_id) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                let loan = Loan {
                    id: self.next_loan_id.fetch_add(1, Ordering::Relaxed),
                    account_id,
                    amount,
                    due_at,
                };
                self.loans.insert(loan.id, loan.clone());
                slot.insert(loan.id);
                Ok(loan)
            }
        }
    }

    async fn delete_loan(&self, loan_id: LoanId) -> Result<(), StoreError> {
        let account_id = self
            .loans
            .get(&loan_id)
            .map(|entry| entry.value().account_id)
            .ok_or(StoreError::NotFound)?;
        // Whoever releases the owner slot owns the delete
        self.loan_owners
            .remove_if(&account_id, |_, owned| *owned == loan_id)
            .ok_or(StoreError::NotFound)?;
        self.loans.remove(&loan_id);
        Ok(())
    }
}
