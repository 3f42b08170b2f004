//! Types module
//!
//! Contains core data structures used throughout the service.
//! This module organizes types into logical submodules:
//! - `account`: Account records and their public view
//! - `loan`: Loan records, views and payment confirmations
//! - `error`: Error types for the store seam and the service

pub mod account;
pub mod error;
pub mod loan;

pub use account::{Account, AccountId, AccountView};
pub use error::{LoanServiceError, StoreError};
pub use loan::{Loan, LoanId, LoanView, PaymentConfirmation, LOAN_PAID_MESSAGE};
