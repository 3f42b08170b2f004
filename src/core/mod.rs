//! Core business logic module
//!
//! This module contains the account and loan components:
//! - `traits` - Seams for persistence, credential checking and time
//! - `account_directory` - Registration and login
//! - `loan_ledger` - Loan lifecycle and the single-active-loan rule

pub mod account_directory;
pub mod loan_ledger;
pub mod traits;

pub use account_directory::{AccountDirectory, PlaintextVerifier};
pub use loan_ledger::{due_date_from, LoanLedger, SystemClock};
pub use traits::{Clock, CredentialVerifier, Store};
