//! Data models for the Monzo API.
//!
//! Models are parsed from loosely-shaped JSON: list endpoints sometimes answer
//! with a single object, and every `parse` function normalizes that to a list.
//!
//! - [`primitives`] - Identifiers, timestamp parsing, shape normalization
//! - [`enums`] - Account types
//! - [`account`] - Accounts and their owners
//! - [`transaction`] - Transactions and attachments

pub mod primitives;
pub mod enums;
pub mod account;
pub mod transaction;

// Re-export commonly used types
pub use primitives::{parse_timestamp, AccountId, TransactionId};
pub use enums::*;
pub use account::*;
pub use transaction::*;
