//! Protocol messages
//!
//! Request and response bodies of the five remote operations. Field names are
//! camelCase on the wire, amounts and identifiers are 32-bit signed integers
//! and `payDay` is an epoch timestamp in seconds.

use crate::types::{AccountView, LoanServiceError, LoanView, PaymentConfirmation};
use serde::{Deserialize, Serialize};

/// Body of `LoginClient`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub name: String,
    pub password: String,
}

/// Body of `RegisterClient`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegisterCredentials {
    pub name: String,
    pub password: String,
}

/// Body of `RequestAmount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequest {
    pub client_id: i32,
    pub amount: i32,
}

/// A client as seen on the wire
///
/// Returned by login (with the current loan's amount and due date, zero when
/// there is none) and by registration (name and id only). Also the request
/// body of `CheckClientStatus` and `PayLoan`, where only `id` is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
    pub name: String,
    pub amount: i32,
    pub id: i32,
    pub pay_day: i64,
}

/// Loan summary; all zero when the client has no loan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanInfo {
    pub id: i32,
    pub amount: i32,
    pub pay_day: i64,
}

/// Outcome message of `PayLoan`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMsg {
    pub msg: String,
}

/// Error body carrying the protocol error string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Narrow a stored amount to its 32-bit wire form, saturating at the bounds
pub fn amount_to_wire(amount: i64) -> i32 {
    i32::try_from(amount).unwrap_or(if amount < 0 { i32::MIN } else { i32::MAX })
}

/// Narrow a stored identifier to its 32-bit wire form
///
/// Identifiers are never clamped: two records must not share a wire id.
///
/// # Errors
///
/// Returns `LoanServiceError::IdOutOfRange` if `id` does not fit in an `i32`.
pub fn id_to_wire(id: i64) -> Result<i32, LoanServiceError> {
    i32::try_from(id).map_err(|_| LoanServiceError::IdOutOfRange { id })
}

impl TryFrom<&LoanView> for LoanInfo {
    type Error = LoanServiceError;

    fn try_from(loan: &LoanView) -> Result<Self, Self::Error> {
        Ok(LoanInfo {
            id: id_to_wire(loan.id)?,
            amount: amount_to_wire(loan.amount),
            pay_day: loan.due_at.timestamp(),
        })
    }
}

impl Client {
    /// Wire form of an account, with its loan if it has one
    ///
    /// # Errors
    ///
    /// Returns `LoanServiceError::IdOutOfRange` if the account id does not
    /// fit the wire format.
    pub fn from_account(
        account: &AccountView,
        loan: Option<&LoanView>,
    ) -> Result<Self, LoanServiceError> {
        Ok(Client {
            name: account.name.clone(),
            amount: loan.map(|l| amount_to_wire(l.amount)).unwrap_or_default(),
            id: id_to_wire(account.id)?,
            pay_day: loan.map(|l| l.due_at.timestamp()).unwrap_or_default(),
        })
    }
}

impl From<PaymentConfirmation> for OperationMsg {
    fn from(confirmation: PaymentConfirmation) -> Self {
        OperationMsg {
            msg: confirmation.message,
        }
    }
}
