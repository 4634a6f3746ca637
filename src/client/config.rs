//! Client configuration options.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::{Host, Url};

use crate::{Error, Result};

/// Production API host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.monzo.com/";

/// Browser-facing authorization host.
pub const DEFAULT_AUTH_URL: &str = "https://auth.monzo.com/";

/// Redirect target registered for the local callback listener.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3456";

/// Environment variable holding the OAuth client id.
pub const ENV_CLIENT_ID: &str = "MONZO_EXPENSES_CLIENT_ID";

/// Environment variable holding the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "MONZO_EXPENSES_CLIENT_SECRET";

/// Environment variable overriding the redirect URI.
pub const ENV_REDIRECT_URI: &str = "MONZO_EXPENSES_REDIRECT_URI";

/// OAuth client credentials registered on the Monzo developer portal.
///
/// Construction validates the values, so a `Credentials` is always usable.
///
/// # Example
///
/// ```
/// use monzo_expenses::Credentials;
///
/// let credentials = Credentials::new(
///     "oauth2client_00009",
///     "mnzconf.secret",
///     "http://localhost:3456",
/// ).unwrap();
/// assert_eq!(credentials.callback_port(), 3456);
/// ```
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    redirect_url: Url,
}

impl Credentials {
    /// Validate and build credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client id or secret is blank, or the
    /// redirect URI is not an absolute `http` URL with a host.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: &str,
    ) -> Result<Self> {
        let client_id = client_id.into().trim().to_string();
        let client_secret = client_secret.into().trim().to_string();

        if client_id.is_empty() {
            return Err(Error::Config("client id must not be empty".to_string()));
        }
        if client_secret.is_empty() {
            return Err(Error::Config("client secret must not be empty".to_string()));
        }

        let redirect_uri = redirect_uri.trim();
        let redirect_url = Url::parse(redirect_uri)
            .map_err(|e| Error::Config(format!("invalid redirect URI {:?}: {}", redirect_uri, e)))?;
        if redirect_url.scheme() != "http" || redirect_url.host_str().is_none() {
            return Err(Error::Config(format!(
                "redirect URI must be an http URL with a host, got {}",
                redirect_uri
            )));
        }

        Ok(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            redirect_uri: redirect_uri.to_string(),
            redirect_url,
        })
    }

    /// Read credentials from the `MONZO_EXPENSES_*` environment variables.
    ///
    /// The redirect URI falls back to [`DEFAULT_REDIRECT_URI`].
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var(ENV_CLIENT_ID)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_CLIENT_ID)))?;
        let client_secret = std::env::var(ENV_CLIENT_SECRET)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_CLIENT_SECRET)))?;
        let redirect_uri =
            std::env::var(ENV_REDIRECT_URI).unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string());
        Self::new(client_id, client_secret, &redirect_uri)
    }

    /// OAuth client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }

    /// Redirect URI exactly as registered with the provider.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Port the callback listener binds to.
    pub fn callback_port(&self) -> u16 {
        self.redirect_url.port_or_known_default().unwrap_or(80)
    }

    /// Path the provider redirects to, `/` when the URI has none.
    pub fn callback_path(&self) -> &str {
        self.redirect_url.path()
    }

    /// Address the callback listener binds to.
    ///
    /// Loopback redirects listen on the matching loopback interface, so an
    /// `[::1]` redirect gets an IPv6 socket. Any other host (a public address
    /// on a headless machine) listens on every IPv4 interface.
    pub fn callback_addr(&self) -> SocketAddr {
        let ip = match self.redirect_url.host() {
            Some(Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            }
            Some(Host::Ipv4(ip)) if ip.is_loopback() => IpAddr::V4(ip),
            Some(Host::Ipv6(ip)) if ip.is_loopback() => IpAddr::V6(ip),
            _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        SocketAddr::new(ip, self.callback_port())
    }

    /// Returns `true` if the redirect points back at this machine only.
    pub fn is_loopback_redirect(&self) -> bool {
        !self.callback_addr().ip().is_unspecified()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Configuration for the Monzo client.
///
/// # Example
///
/// ```
/// use monzo_expenses::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_callback_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Base URL for resource and token endpoints
    pub api_base_url: String,
    /// Authorization page opened in the browser
    pub auth_url: String,
    /// How long to wait for the OAuth redirect
    pub callback_timeout: Duration,
    /// Where the token response is cached; `None` disables caching
    pub token_cache: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("monzo-expenses/{} (Rust)", env!("CARGO_PKG_VERSION")),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            callback_timeout: Duration::from_secs(5 * 60),
            token_cache: crate::auth::TokenCache::default_path(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Point resource and token requests at another host.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Use another authorization page.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Set how long to wait for the OAuth redirect.
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Cache token responses at `path`.
    pub fn with_token_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_cache = Some(path.into());
        self
    }

    /// Never read or write a token cache.
    pub fn without_token_cache(mut self) -> Self {
        self.token_cache = None;
        self
    }

    /// Resolve an API path against the base URL.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url> {
        let base = if self.api_base_url.ends_with('/') {
            Url::parse(&self.api_base_url)?
        } else {
            Url::parse(&format!("{}/", self.api_base_url))?
        };
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    /// Build an API URL from literal path segments.
    ///
    /// Each segment is percent-encoded on its own, so a `/` or `?` inside an
    /// identifier cannot reach another endpoint.
    pub(crate) fn api_url_segments(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url("")?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{} cannot be a base URL", self.api_base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
