//! Accounts service.

use std::sync::Arc;

use crate::client::ClientInner;
use crate::models::Account;
use crate::Result;

/// Service for account-related operations.
///
/// # Example
///
/// ```no_run
/// # async fn example(client: monzo_expenses::MonzoClient) -> monzo_expenses::Result<()> {
/// for account in client.accounts().list().await? {
///     println!("{} ({}): {}", account.identifier, account.account_type, account.description);
/// }
/// # Ok(())
/// # }
/// ```
pub struct AccountsService {
    inner: Arc<ClientInner>,
}

impl AccountsService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// List every account the token grants access to, in server order.
    pub async fn list(&self) -> Result<Vec<Account>> {
        let payload = self.inner.get_json("accounts").await?;
        Account::parse(&payload)
    }
}
