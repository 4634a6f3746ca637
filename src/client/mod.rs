//! HTTP client and service layer for the Monzo API.
//!
//! [`MonzoClient`] is the entry point. It carries the OAuth credentials and
//! session, and hands out service handles for each API area.
//!
//! # Example
//!
//! ```no_run
//! use monzo_expenses::MonzoClient;
//!
//! # async fn example() -> monzo_expenses::Result<()> {
//! let client = MonzoClient::from_env()?;
//! if !client.restore_session().await? {
//!     client.authenticate().await?;
//! }
//!
//! let accounts = client.accounts().list().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod http;

pub use config::{
    ClientConfig, Credentials, DEFAULT_API_BASE_URL, DEFAULT_AUTH_URL, DEFAULT_REDIRECT_URI,
    ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_REDIRECT_URI,
};
pub use http::MonzoClient;
pub(crate) use http::ClientInner;
