//! # monzo-expenses
//!
//! A Rust client for the Monzo banking API and an expense report builder on
//! top of it.
//!
//! ## Features
//!
//! - **Authentication**: OAuth2 authorization-code flow with a local redirect listener
//! - **Token cache**: the last token response is kept on disk between runs
//! - **Accounts and transactions**: typed models parsed from Monzo's JSON
//! - **Typed errors**: every non-2xx status maps to its own [`Error`] variant
//! - **Expense reports**: period and category filtering rendered as HTML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use monzo_expenses::{ClientConfig, Credentials, MonzoClient};
//!
//! #[tokio::main]
//! async fn main() -> monzo_expenses::Result<()> {
//!     let credentials = Credentials::new(
//!         "oauth2client_00009",
//!         "mnzconf.secret",
//!         "http://localhost:3456",
//!     )?;
//!     let client = MonzoClient::new(credentials, ClientConfig::default())?;
//!
//!     if !client.restore_session().await? {
//!         client.authenticate().await?;
//!     }
//!
//!     let accounts = client
//!         .with_reauthentication(|client| async move { client.accounts().list().await })
//!         .await?;
//!     println!("Found {} accounts", accounts.len());
//!
//!     if let Some(account) = accounts.first() {
//!         let transactions = client.transactions().list(&account.identifier).await?;
//!         println!("{} has {} transactions", account.identifier, transactions.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod report;

// Re-export primary types at crate root for convenience
pub use auth::Session;
pub use client::{ClientConfig, Credentials, MonzoClient};
pub use error::{Error, Result};
pub use models::{AccountId, TransactionId};

/// Prelude module for convenient imports.
///
/// ```rust
/// use monzo_expenses::prelude::*;
/// ```
pub mod prelude {
    pub use crate::auth::Session;
    pub use crate::client::{ClientConfig, Credentials, MonzoClient};
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        Account, AccountId, AccountType, Attachment, Owner, Transaction, TransactionId,
    };
    pub use crate::report::ExpenseReport;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_creation() {
        let account = AccountId::new("acc_00009237aqC8c5umZmrRdh");
        assert_eq!(account.as_str(), "acc_00009237aqC8c5umZmrRdh");
    }

    #[test]
    fn test_default_endpoints() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, client::DEFAULT_API_BASE_URL);
        assert_eq!(config.auth_url, "https://auth.monzo.com/");
    }
}
