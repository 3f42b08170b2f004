//! Loan Service Library
//! # Overview
//!
//! This library provides a remote loan-account service: clients register,
//! log in, request a single loan, check its status and pay it off.
//!
//! # Architecture
//!
//! The system is organized into several key components, leaf-first:
//!
//! - [`store`] - Persistence of accounts and loans behind the [`Store`] trait,
//!   with atomic create-if-absent and delete-if-present primitives
//! - [`core`] - Business logic components:
//!   - [`core::account_directory`] - Registration and credential verification
//!   - [`core::loan_ledger`] - Loan lifecycle and the single-active-loan rule
//! - [`service`] - Service Facade mapping protocol calls onto the core
//! - [`server`] - HTTP/JSON request dispatcher and listener
//! - [`cli`] - Startup arguments
//! - [`logging`] - Tracing subscriber setup
//!
//! # Loan Lifecycle
//!
//! Each account holds at most one loan at a time:
//!
//! - **RequestAmount**: opens a loan due one year later; rejected while a loan is active
//! - **CheckClientStatus**: reads the current loan
//! - **PayLoan**: removes the loan; rejected when there is none
//!
//! # Consistency
//!
//! Concurrent requests for the same account are serialized by the store's
//! atomic primitives alone: of N concurrent loan requests exactly one
//! succeeds, and registration has the same guarantee for names.

// Module declarations
pub mod cli;
pub mod core;
pub mod logging;
pub mod server;
pub mod service;
pub mod store;
pub mod types;

pub use self::core::{AccountDirectory, CredentialVerifier, LoanLedger, Store};
pub use service::{CallContext, LoanService};
pub use types::{
    Account, AccountId, AccountView, Loan, LoanId, LoanServiceError, LoanView,
    PaymentConfirmation, StoreError,
};
