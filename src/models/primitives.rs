//! Primitive types shared by the Monzo models.
//!
//! This module provides strongly-typed identifiers, the timestamp parser used
//! by every model, and the helper that normalizes "one object or a list of
//! objects" payloads into a list.

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::{Error, Result};

/// Timestamp with fractional seconds, e.g. `2020-01-02T03:04:05.123456Z`.
const TIMESTAMP_FRACTIONAL: &str = "%Y-%m-%dT%H:%M:%S.%fZ";

/// Timestamp without fractional seconds, e.g. `2020-01-02T03:04:05Z`.
const TIMESTAMP_WHOLE: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A strongly-typed Monzo account identifier (`acc_...`).
///
/// # Example
///
/// ```
/// use monzo_expenses::AccountId;
///
/// let account = AccountId::new("acc_00009237aqC8c5umZmrRdh");
/// println!("Account: {}", account);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account identifier from a string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A strongly-typed transaction identifier (`tx_...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create a new transaction identifier.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Parse an API timestamp.
///
/// `None` and the empty string both mean "no timestamp". Fractional seconds
/// of one to six digits are accepted but dropped. Whitespace anywhere in the
/// text is rejected.
///
/// # Example
///
/// ```
/// use monzo_expenses::models::parse_timestamp;
///
/// let with_fraction = parse_timestamp(Some("2020-01-02T03:04:05.123456Z")).unwrap();
/// let without = parse_timestamp(Some("2020-01-02T03:04:05Z")).unwrap();
/// assert_eq!(with_fraction, without);
/// assert!(parse_timestamp(Some("")).unwrap().is_none());
/// assert!(parse_timestamp(Some("not-a-date")).is_err());
/// ```
pub fn parse_timestamp(text: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let text = match text {
        None | Some("") => return Ok(None),
        Some(text) => text,
    };

    let malformed = || Error::MalformedTimestamp(text.to_string());
    if !has_timestamp_shape(text) {
        return Err(malformed());
    }

    let naive = NaiveDateTime::parse_from_str(text, TIMESTAMP_FRACTIONAL)
        .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_WHOLE))
        .map_err(|_| malformed())?;

    let naive = naive.with_nanosecond(0).unwrap_or(naive);
    Ok(Some(Utc.from_utc_datetime(&naive)))
}

// chrono skips spaces before numeric fields and takes up to nine fraction
// digits, both looser than the wire format.
fn has_timestamp_shape(text: &str) -> bool {
    if !text.as_bytes().first().is_some_and(u8::is_ascii_digit)
        || text.bytes().any(|b| b.is_ascii_whitespace())
    {
        return false;
    }
    match text.split_once('.') {
        Some((_, fraction)) => fraction
            .strip_suffix('Z')
            .is_some_and(|digits| (1..=6).contains(&digits.len())),
        None => true,
    }
}

/// Parse a timestamp that the API always populates.
pub(crate) fn parse_required_timestamp(text: Option<&str>, field: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(text)?
        .ok_or_else(|| Error::MalformedTimestamp(format!("{} is missing", field)))
}

/// A payload that is either a single object or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Collect the objects of a response that may be wrapped or bare.
///
/// A non-null `plural` key yields its elements (or the value itself if it is
/// not an array); otherwise a non-null `singular` key yields that object;
/// otherwise the whole payload is the single item.
pub(crate) fn collect_items<'a>(
    payload: &'a Value,
    plural: &str,
    singular: Option<&str>,
) -> Vec<&'a Value> {
    let present = |key: &str| payload.get(key).filter(|value| !value.is_null());

    if let Some(items) = present(plural) {
        return match items {
            Value::Array(items) => items.iter().collect(),
            item => vec![item],
        };
    }

    match singular.and_then(present) {
        Some(item) => vec![item],
        None => vec![payload],
    }
}
