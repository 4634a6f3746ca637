//! Pieces of the OAuth2 authorization-code flow.
//!
//! [`MonzoClient::authenticate`](crate::MonzoClient::authenticate) strings
//! these together: build the authorization URL, show it to the user, wait for
//! the redirect, check its `state`, and trade the code for a token.

use rand::distr::{Alphanumeric, SampleString};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::callback::CallbackParams;
use crate::client::{ClientConfig, Credentials};
use crate::{Error, Result};

/// Length of the CSRF state token.
pub const STATE_TOKEN_LEN: usize = 20;

/// Generate a fresh random state token.
pub(crate) fn generate_state_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), STATE_TOKEN_LEN)
}

/// Build the page the user visits to grant access.
///
/// # Example
///
/// ```
/// use monzo_expenses::auth::authorization_url;
/// use monzo_expenses::Credentials;
///
/// let credentials = Credentials::new("client", "secret", "http://localhost:3456").unwrap();
/// let url = authorization_url("https://auth.monzo.com/", &credentials, "s1").unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://auth.monzo.com/?client_id=client&redirect_uri=http%3A%2F%2Flocalhost%3A3456&response_type=code&state=s1"
/// );
/// ```
pub fn authorization_url(auth_url: &str, credentials: &Credentials, state: &str) -> Result<Url> {
    let mut url = Url::parse(auth_url)?;
    url.query_pairs_mut()
        .append_pair("client_id", credentials.client_id())
        .append_pair("redirect_uri", credentials.redirect_uri())
        .append_pair("response_type", "code")
        .append_pair("state", state);
    Ok(url)
}

/// Check the redirect parameters and extract the authorization code.
///
/// The `state` parameter must appear exactly once and equal
/// `expected_state`; only then is `code` looked at.
///
/// # Errors
///
/// [`Error::InvalidState`] if the state is missing, repeated, or different;
/// [`Error::MissingAuthorizationCode`] if there is no non-empty `code`.
pub fn authorization_code(params: &CallbackParams, expected_state: &str) -> Result<String> {
    match params.get("state").map(Vec::as_slice) {
        Some([state]) if state == expected_state => {}
        Some([_]) => {
            return Err(Error::InvalidState(
                "state did not match the value sent with the authorization request".to_string(),
            ))
        }
        Some(values) if values.len() > 1 => {
            return Err(Error::InvalidState(format!(
                "expected one state value, got {}",
                values.len()
            )))
        }
        _ => return Err(Error::InvalidState("redirect carried no state".to_string())),
    }

    params
        .get("code")
        .and_then(|codes| codes.first())
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or(Error::MissingAuthorizationCode)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Trade an authorization code for a token at `<api_base>/oauth2/token`.
///
/// Returns the full response body together with the access token it carries.
pub(crate) async fn exchange_code(
    http: &reqwest::Client,
    config: &ClientConfig,
    credentials: &Credentials,
    code: &str,
) -> Result<(Value, String)> {
    let url = config.api_url("oauth2/token")?;

    let response = http
        .post(url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", credentials.client_id()),
            ("client_secret", credentials.client_secret()),
            ("redirect_uri", credentials.redirect_uri()),
            ("code", code),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::from_status(status.as_u16(), body));
    }

    let raw: Value = serde_json::from_str(&body)?;
    let token = TokenResponse::deserialize(&raw)?;
    Ok((raw, token.access_token))
}

/// Opens the authorization page for the user.
pub trait BrowserLauncher {
    /// Try to open `url`; an error makes the flow print the link instead.
    fn open(&self, url: &str) -> Result<()>;
}

/// Launches the platform's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let mut command = if cfg!(target_os = "macos") {
            let mut command = std::process::Command::new("open");
            command.arg(url);
            command
        } else if cfg!(target_os = "windows") {
            let mut command = std::process::Command::new("cmd");
            command.args(["/C", "start", "", url]);
            command
        } else {
            let mut command = std::process::Command::new("xdg-open");
            command.arg(url);
            command
        };

        command
            .spawn()
            .map(|_| ())
            .map_err(|e| Error::BrowserLaunch(e.to_string()))
    }
}

/// Never opens anything; the flow prints the link for a manual visit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualBrowser;

impl BrowserLauncher for ManualBrowser {
    fn open(&self, _url: &str) -> Result<()> {
        Err(Error::BrowserLaunch("browser launch disabled".to_string()))
    }
}
