//! Account and owner models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::AccountType;
use super::primitives::{collect_items, parse_required_timestamp, AccountId, OneOrMany};
use crate::Result;

/// A person holding an account.
///
/// Two owners are equal when their `user_id` matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    /// Monzo user identifier
    pub user_id: String,
    /// Full preferred name
    pub preferred_name: String,
    /// Preferred first name
    pub preferred_first_name: String,
}

impl Owner {
    /// Parse owners from a single object or a list of objects.
    pub fn parse(json: &Value) -> Result<Vec<Owner>> {
        Ok(OneOrMany::<Owner>::deserialize(json)?.into_vec())
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id
    }
}

impl Eq for Owner {}

/// A Monzo account.
///
/// Two accounts are equal when their identifiers match.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// Unique account identifier
    pub identifier: AccountId,
    /// Free-text description assigned by Monzo
    pub description: String,
    /// When the account was opened
    pub created: DateTime<Utc>,
    /// Whether the account has been closed
    pub is_closed: bool,
    /// Kind of account
    pub account_type: AccountType,
    /// Account holders, in the order the API lists them
    pub owners: Vec<Owner>,
    /// UK account number, absent for prepaid accounts
    pub account_number: Option<String>,
    /// UK sort code without separators, absent for prepaid accounts
    pub sort_code: Option<String>,
}

/// Account object as it appears on the wire.
#[derive(Debug, Deserialize)]
struct AccountPayload {
    id: String,
    description: String,
    #[serde(default)]
    created: Option<String>,
    closed: bool,
    #[serde(rename = "type")]
    account_type: String,
    owners: OneOrMany<Owner>,
    #[serde(default)]
    account_number: Option<String>,
    #[serde(default)]
    sort_code: Option<String>,
}

impl Account {
    /// Parse the accounts response.
    ///
    /// The payload is either `{"accounts": [...]}` or a bare account object;
    /// both produce a list.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::UnknownAccountType`] on an unmapped `type`,
    /// [`crate::Error::MalformedTimestamp`] on a bad `created`, and
    /// [`crate::Error::Json`] on missing or mistyped fields.
    pub fn parse(json: &Value) -> Result<Vec<Account>> {
        collect_items(json, "accounts", None)
            .into_iter()
            .map(Account::from_payload)
            .collect()
    }

    fn from_payload(json: &Value) -> Result<Account> {
        let payload = AccountPayload::deserialize(json)?;

        Ok(Account {
            identifier: AccountId::new(payload.id),
            description: payload.description,
            created: parse_required_timestamp(payload.created.as_deref(), "created")?,
            is_closed: payload.closed,
            account_type: AccountType::from_code(&payload.account_type)?,
            owners: payload.owners.into_vec(),
            account_number: payload.account_number,
            sort_code: payload.sort_code,
        })
    }

    /// The first listed owner, if any.
    pub fn primary_owner(&self) -> Option<&Owner> {
        self.owners.first()
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Account {}
