//! Service Facade
//!
//! This module provides the `LoanService`, which maps the five remote
//! operations onto the Account Directory and Loan Ledger and their results
//! back onto protocol messages. It adds no business rules of its own: the
//! only composition it performs is attaching the caller's current loan to a
//! login response.
//!
//! # Operations
//!
//! | Operation           | Delegates to                                   |
//! |---------------------|------------------------------------------------|
//! | `LoginClient`       | `AccountDirectory::login` + `LoanLedger::check_status` |
//! | `RegisterClient`    | `AccountDirectory::register`                   |
//! | `RequestAmount`     | `LoanLedger::request_loan`                     |
//! | `CheckClientStatus` | `LoanLedger::check_status`                     |
//! | `PayLoan`           | `LoanLedger::pay_loan`                         |

use crate::core::{AccountDirectory, LoanLedger, Store};
use crate::types::{AccountId, LoanServiceError, LoanView};
use std::sync::Arc;
use tracing::{debug, warn};

pub mod context;
pub mod messages;

pub use context::CallContext;
pub use messages::{
    Client, ErrorBody, LoanInfo, LoanRequest, OperationMsg, UserCredentials,
    UserRegisterCredentials,
};

/// Facade over the Account Directory and Loan Ledger
///
/// Cheap to clone; safe to call concurrently from any number of tasks.
#[derive(Clone)]
pub struct LoanService {
    directory: AccountDirectory,
    ledger: LoanLedger,
}

impl LoanService {
    /// Build the directory and ledger on one shared store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::from_parts(AccountDirectory::new(Arc::clone(&store)), LoanLedger::new(store))
    }

    /// Use an already-configured directory and ledger
    pub fn from_parts(directory: AccountDirectory, ledger: LoanLedger) -> Self {
        Self { directory, ledger }
    }

    /// `LoginClient`: authenticate and return the client with its current loan
    ///
    /// An unknown name and a wrong password are reported identically as
    /// `InvalidCredentials`. A client without a loan gets zero amount and
    /// pay day.
    pub async fn login_client(
        &self,
        ctx: &CallContext,
        credentials: UserCredentials,
    ) -> Result<Client, LoanServiceError> {
        let result = ctx
            .run(async {
                let account = self
                    .directory
                    .login(&credentials.name, &credentials.password)
                    .await
                    .map_err(|err| match err {
                        LoanServiceError::NotFound { .. } => LoanServiceError::InvalidCredentials,
                        other => other,
                    })?;
                let loan = self.current_loan(account.id).await?;
                Client::from_account(&account, loan.as_ref())
            })
            .await;
        log_outcome("LoginClient", &result);
        result
    }

    /// `RegisterClient`: create an account and return its name and id
    pub async fn register_client(
        &self,
        ctx: &CallContext,
        credentials: UserRegisterCredentials,
    ) -> Result<Client, LoanServiceError> {
        let result = ctx
            .run(async {
                let account = self
                    .directory
                    .register(&credentials.name, &credentials.password)
                    .await?;
                Client::from_account(&account, None)
            })
            .await;
        log_outcome("RegisterClient", &result);
        result
    }

    /// `RequestAmount`: open the client's loan
    pub async fn request_amount(
        &self,
        ctx: &CallContext,
        request: LoanRequest,
    ) -> Result<LoanInfo, LoanServiceError> {
        let result = ctx
            .run(async {
                let loan = self
                    .ledger
                    .request_loan(AccountId::from(request.client_id), i64::from(request.amount))
                    .await?;
                LoanInfo::try_from(&loan)
            })
            .await;
        log_outcome("RequestAmount", &result);
        result
    }

    /// `CheckClientStatus`: the client's current loan, or an empty
    /// `LoanInfo` when there is none
    pub async fn check_client_status(
        &self,
        ctx: &CallContext,
        client: Client,
    ) -> Result<LoanInfo, LoanServiceError> {
        let result = ctx
            .run(async {
                let loan = self.current_loan(AccountId::from(client.id)).await?;
                let info = loan.as_ref().map(LoanInfo::try_from).transpose()?;
                Ok::<_, LoanServiceError>(info.unwrap_or_default())
            })
            .await;
        log_outcome("CheckClientStatus", &result);
        result
    }

    /// `PayLoan`: remove the client's loan
    pub async fn pay_loan(
        &self,
        ctx: &CallContext,
        client: Client,
    ) -> Result<OperationMsg, LoanServiceError> {
        let result = ctx
            .run(async {
                let confirmation = self.ledger.pay_loan(AccountId::from(client.id)).await?;
                Ok::<_, LoanServiceError>(OperationMsg::from(confirmation))
            })
            .await;
        log_outcome("PayLoan", &result);
        result
    }

    /// The account's loan, with absence mapped to `None`
    async fn current_loan(&self, account_id: AccountId) -> Result<Option<LoanView>, LoanServiceError> {
        match self.ledger.check_status(account_id).await {
            Ok(loan) => Ok(Some(loan)),
            Err(LoanServiceError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn log_outcome<T>(operation: &'static str, result: &Result<T, LoanServiceError>) {
    match result {
        Ok(_) => debug!(operation, "call completed"),
        Err(err) if err.is_rejection() => debug!(operation, error = %err, "call rejected"),
        Err(err) => warn!(operation, error = %err, "call failed"),
    }
}
