//! API service modules for Monzo endpoints.
//!
//! Each service covers one area of the API and is obtained from
//! [`MonzoClient`](crate::MonzoClient).

mod accounts;
mod transactions;

pub use accounts::AccountsService;
pub use transactions::TransactionsService;
