//! Transaction and attachment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::primitives::{
    collect_items, parse_required_timestamp, parse_timestamp, AccountId, TransactionId,
};
use crate::Result;

/// A file (usually a receipt) attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment identifier, not present on every payload
    #[serde(rename = "id", default)]
    pub identifier: Option<String>,
    /// Identifier of the transaction the file is attached to
    pub external_id: String,
    /// MIME type of the file
    pub file_type: String,
    /// Where the file can be downloaded
    pub file_url: String,
    /// Uploading user
    pub user_id: String,
}

impl Attachment {
    /// Parse a single attachment object.
    pub fn parse(json: &Value) -> Result<Attachment> {
        Ok(Attachment::deserialize(json)?)
    }
}

/// A Monzo transaction.
///
/// Only the fields needed for reporting are typed; the complete original
/// object is kept in [`raw_data`](Self::raw_data). Two transactions are equal
/// when their identifiers match.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    /// Unique transaction identifier
    pub identifier: TransactionId,
    /// Account the transaction belongs to
    pub account_id: AccountId,
    /// User who made the transaction
    pub user_id: String,
    /// Statement description
    pub description: String,
    /// Amount in minor units of `currency`; negative for debits
    pub amount: i64,
    /// ISO 4217 currency of `amount`
    pub currency: String,
    /// Monzo spending category, e.g. `expenses`
    pub category: String,
    /// Amount in minor units of `local_currency`
    pub local_amount: i64,
    /// Currency the transaction was made in
    pub local_currency: String,
    /// Account balance after the transaction, in minor units
    pub account_balance: i64,
    /// When the transaction was created
    pub created: DateTime<Utc>,
    /// When the transaction was last updated
    pub updated: DateTime<Utc>,
    /// When the transaction settled, if it has
    pub settled: Option<DateTime<Utc>>,
    /// Attached files
    pub attachments: Vec<Attachment>,
    /// The transaction object exactly as received
    pub raw_data: Value,
}

/// Transaction object as it appears on the wire.
#[derive(Debug, Deserialize)]
struct TransactionPayload {
    id: String,
    account_id: String,
    #[serde(default)]
    user_id: String,
    description: String,
    amount: i64,
    currency: String,
    category: String,
    local_amount: i64,
    local_currency: String,
    account_balance: i64,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    settled: Option<String>,
    #[serde(default)]
    attachments: Option<Vec<Attachment>>,
}

impl Transaction {
    /// Parse a transactions response.
    ///
    /// Accepts `{"transactions": [...]}`, `{"transaction": {...}}` or a bare
    /// transaction object; all three produce a list.
    pub fn parse(json: &Value) -> Result<Vec<Transaction>> {
        collect_items(json, "transactions", Some("transaction"))
            .into_iter()
            .map(Transaction::from_payload)
            .collect()
    }

    fn from_payload(json: &Value) -> Result<Transaction> {
        let payload = TransactionPayload::deserialize(json)?;

        Ok(Transaction {
            identifier: TransactionId::new(payload.id),
            account_id: AccountId::new(payload.account_id),
            user_id: payload.user_id,
            description: payload.description,
            amount: payload.amount,
            currency: payload.currency,
            category: payload.category,
            local_amount: payload.local_amount,
            local_currency: payload.local_currency,
            account_balance: payload.account_balance,
            created: parse_required_timestamp(payload.created.as_deref(), "created")?,
            updated: parse_required_timestamp(payload.updated.as_deref(), "updated")?,
            settled: parse_timestamp(payload.settled.as_deref())?,
            attachments: payload.attachments.unwrap_or_default(),
            raw_data: json.clone(),
        })
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Transaction {}
