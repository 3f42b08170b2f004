//! Account-related types for the loan service
//!
//! This module defines the stored Account record and the view of it that
//! leaves the Account Directory.

/// Account identifier
///
/// Assigned by the store on creation. Transmitted as a 32-bit integer on the
/// wire; stored wider.
pub type AccountId = i64;

/// Registered account as persisted by the store
///
/// Accounts are immutable once created: there is no rename or
/// password-change operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Store-assigned identifier
    pub id: AccountId,

    /// Unique, case-sensitive display name
    pub name: String,

    /// Credential secret, opaque to everything except the verifier
    pub secret: String,
}

/// Public projection of an account
///
/// Returned by registration and login. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        AccountView {
            id: account.id,
            name: account.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_drops_secret() {
        let account = Account {
            id: 7,
            name: "bob".to_string(),
            secret: "p1".to_string(),
        };

        let view = AccountView::from(account);

        assert_eq!(
            view,
            AccountView {
                id: 7,
                name: "bob".to_string()
            }
        );
    }
}
