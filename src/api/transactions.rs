//! Transactions service for account history.

use std::sync::Arc;

use serde::Serialize;

use crate::client::ClientInner;
use crate::models::{AccountId, Transaction, TransactionId};
use crate::{Error, Result};

/// Service for transaction history.
///
/// # Example
///
/// ```no_run
/// use monzo_expenses::AccountId;
///
/// # async fn example(client: monzo_expenses::MonzoClient) -> monzo_expenses::Result<()> {
/// let account = AccountId::new("acc_00009237aqC8c5umZmrRdh");
///
/// for txn in client.transactions().list(&account).await? {
///     println!("{} {:?}: {}", txn.created, txn.category, txn.amount);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TransactionsService {
    inner: Arc<ClientInner>,
}

/// Query parameters sent with transaction requests.
#[derive(Debug, Serialize)]
struct TransactionsQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    account_id: Option<&'a str>,
    #[serde(rename = "expand[]")]
    expand: &'a str,
}

impl<'a> TransactionsQuery<'a> {
    fn new(account_id: Option<&'a AccountId>) -> Self {
        Self {
            account_id: account_id.map(AccountId::as_str),
            expand: "merchant",
        }
    }
}

impl TransactionsService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// List all transactions of an account with merchant details expanded.
    pub async fn list(&self, account_id: &AccountId) -> Result<Vec<Transaction>> {
        let payload = self
            .inner
            .get_json_with_query(&["transactions"], &TransactionsQuery::new(Some(account_id)))
            .await?;
        Transaction::parse(&payload)
    }

    /// Fetch a single transaction.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the id is blank or a dot segment, or the
    /// response parses to no transaction.
    pub async fn get(&self, id: &TransactionId) -> Result<Transaction> {
        if matches!(id.as_str(), "" | "." | "..") {
            return Err(Error::InvalidInput(format!("invalid transaction id {:?}", id.as_str())));
        }

        let payload = self
            .inner
            .get_json_with_query(&["transactions", id.as_str()], &TransactionsQuery::new(None))
            .await?;
        Transaction::parse(&payload)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidInput(format!("no transaction in response for {}", id)))
    }
}
