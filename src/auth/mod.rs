//! Authentication for the Monzo API.
//!
//! Monzo uses the OAuth2 authorization-code flow. The user approves access in
//! a browser, Monzo redirects to a local [`CallbackServer`] with a one-time
//! code, and the code is exchanged for an access token:
//!
//! ```no_run
//! use monzo_expenses::{ClientConfig, Credentials, MonzoClient};
//!
//! # async fn example() -> monzo_expenses::Result<()> {
//! let credentials = Credentials::from_env()?;
//! let client = MonzoClient::new(credentials, ClientConfig::default())?;
//!
//! if !client.restore_session().await? {
//!     client.authenticate().await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Tokens are not refreshed. When the API starts rejecting the token the flow
//! has to run again; see
//! [`MonzoClient::with_reauthentication`](crate::MonzoClient::with_reauthentication).

mod cache;
mod callback;
mod flow;
mod session;

pub use cache::TokenCache;
pub use callback::{CallbackListener, CallbackParams, CallbackServer};
pub use flow::{
    authorization_code, authorization_url, BrowserLauncher, ManualBrowser, SystemBrowser,
    STATE_TOKEN_LEN,
};
pub use session::{AuthState, Session};

pub(crate) use flow::{exchange_code, generate_state_token};
