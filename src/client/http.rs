//! HTTP client implementation for the Monzo API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use url::Url;

use crate::api::{AccountsService, TransactionsService};
use crate::auth::{
    self, BrowserLauncher, CallbackListener, CallbackServer, Session, SystemBrowser, TokenCache,
};
use crate::{Error, Result};

use super::config::{ClientConfig, Credentials};

/// The main client for interacting with the Monzo API.
///
/// The client owns the OAuth credentials, the CSRF state token for its
/// authorization attempts, and the bearer-token [`Session`]. API calls are
/// made through service handles returned by [`accounts`](Self::accounts) and
/// [`transactions`](Self::transactions).
///
/// # Example
///
/// ```no_run
/// use monzo_expenses::{ClientConfig, Credentials, MonzoClient};
///
/// # async fn example() -> monzo_expenses::Result<()> {
/// let credentials = Credentials::new("client-id", "client-secret", "http://localhost:3456")?;
/// let client = MonzoClient::new(credentials, ClientConfig::default())?;
/// client.authenticate().await?;
///
/// for account in client.accounts().list().await? {
///     let transactions = client.transactions().list(&account.identifier).await?;
///     println!("{}: {} transactions", account.account_type, transactions.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct MonzoClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) session: Session,
    pub(crate) credentials: Credentials,
    pub(crate) config: ClientConfig,
    pub(crate) state_token: String,
}

impl MonzoClient {
    /// Create an unauthenticated client.
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        Self::with_session(credentials, Session::new(), config)
    }

    /// Create an unauthenticated client from `MONZO_EXPENSES_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::new(Credentials::from_env()?, ClientConfig::default())
    }

    /// Create a client around an existing session.
    pub fn with_session(
        credentials: Credentials,
        session: Session,
        config: ClientConfig,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                session,
                credentials,
                config,
                state_token: auth::generate_state_token(),
            }),
        })
    }

    /// Get the accounts service.
    pub fn accounts(&self) -> AccountsService {
        AccountsService::new(self.inner.clone())
    }

    /// Get the transactions service.
    pub fn transactions(&self) -> TransactionsService {
        TransactionsService::new(self.inner.clone())
    }

    /// Get a reference to the session.
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// The CSRF token sent with every authorization request of this client.
    pub fn state_token(&self) -> &str {
        &self.inner.state_token
    }

    /// The configured token cache, if caching is enabled.
    pub fn token_cache(&self) -> Option<TokenCache> {
        self.inner.config.token_cache.clone().map(TokenCache::new)
    }

    /// Returns `true` once an access token is installed.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated().await
    }

    /// Install the cached access token, if there is one.
    ///
    /// Returns `false` when caching is disabled or nothing is cached; the
    /// caller then has to [`authenticate`](Self::authenticate). A cached token
    /// may have expired; that only shows up as `Unauthorized` on the first call.
    pub async fn restore_session(&self) -> Result<bool> {
        let Some(cache) = self.token_cache() else {
            return Ok(false);
        };

        match cache.access_token()? {
            Some(token) => {
                tracing::debug!(path = %cache.path().display(), "Restored cached access token");
                self.inner.session.install(SecretString::from(token)).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run the interactive OAuth flow.
    ///
    /// Binds the local callback listener on the redirect URI's port, opens the
    /// authorization page in the default browser (printing the link if that
    /// fails), and blocks until the redirect arrives or
    /// [`ClientConfig::callback_timeout`] passes.
    pub async fn authenticate(&self) -> Result<()> {
        let listener = CallbackServer::for_redirect(&self.inner.credentials).await?;
        self.authenticate_with(listener, &SystemBrowser).await
    }

    /// Run the OAuth flow with a caller-supplied listener and browser.
    ///
    /// Any failure aborts the flow and leaves the session untouched. On
    /// success the raw token response is written to the token cache before the
    /// session becomes authenticated.
    pub async fn authenticate_with<L, B>(&self, listener: L, browser: &B) -> Result<()>
    where
        L: CallbackListener,
        B: BrowserLauncher + ?Sized,
    {
        let inner = &self.inner;
        let url = auth::authorization_url(
            &inner.config.auth_url,
            &inner.credentials,
            &inner.state_token,
        )?;

        tracing::info!("Opening Monzo authorization page");
        if let Err(e) = browser.open(url.as_str()) {
            tracing::debug!("Could not open browser: {}", e);
            println!("Here is your link to log in: {}", url);
        }

        let params = listener
            .wait_for_call(inner.config.callback_timeout)
            .await?
            .ok_or(Error::InvalidCallback)?;
        let code = auth::authorization_code(&params, &inner.state_token)?;

        let (response, access_token) =
            auth::exchange_code(&inner.http, &inner.config, &inner.credentials, &code).await?;

        if let Some(cache) = self.token_cache() {
            cache.store(&response)?;
        }

        inner.session.install(SecretString::from(access_token)).await;
        tracing::info!("Authenticated with Monzo");
        Ok(())
    }

    /// Run `op`, re-authenticating and retrying once if the token was rejected.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(client: monzo_expenses::MonzoClient) -> monzo_expenses::Result<()> {
    /// let accounts = client
    ///     .with_reauthentication(|client| async move { client.accounts().list().await })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_reauthentication<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut(MonzoClient) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_after_reauthentication(self, op, |client| async move { client.authenticate().await })
            .await
    }

    /// Drop a token the API refused, from memory and from the cache.
    async fn forget_rejected_token(&self) {
        self.inner.session.sign_out().await;
        if let Some(cache) = self.token_cache() {
            if let Err(e) = cache.clear_access_token() {
                tracing::warn!(path = %cache.path().display(), "Could not clear token cache: {}", e);
            }
        }
    }

    /// Issue an authenticated GET against `<api_base>/<path>`.
    ///
    /// Non-2xx responses are turned into the matching [`Error`] variant.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        self.inner.get(path).await
    }
}

/// Shared body of [`MonzoClient::with_reauthentication`].
async fn retry_after_reauthentication<T, F, Fut, A, AFut>(
    client: &MonzoClient,
    mut op: F,
    reauthenticate: A,
) -> Result<T>
where
    F: FnMut(MonzoClient) -> Fut,
    Fut: Future<Output = Result<T>>,
    A: FnOnce(MonzoClient) -> AFut,
    AFut: Future<Output = Result<()>>,
{
    match op(client.clone()).await {
        Err(e) if e.requires_reauthentication() => {
            tracing::warn!("Access token rejected ({}); re-authenticating", e);
            client.forget_rejected_token().await;
            reauthenticate(client.clone()).await?;
            op(client.clone()).await
        }
        result => result,
    }
}

impl ClientInner {
    /// Build request headers with the bearer token.
    pub(crate) async fn build_headers(&self) -> Result<HeaderMap> {
        let token = self
            .session
            .access_token()
            .await
            .ok_or(Error::NotAuthenticated)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| Error::InvalidInput("Invalid token format".to_string()))?,
        );
        Ok(headers)
    }

    /// Make a GET request.
    pub(crate) async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.config.api_url(path)?;
        let headers = self.build_headers().await?;

        tracing::debug!(%url, "GET");
        let response = self.http.get(url).headers(headers).send().await?;

        Self::handle_response(response).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        url: Url,
        query: &Q,
    ) -> Result<reqwest::Response> {
        let headers = self.build_headers().await?;

        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make a GET request and decode the body as JSON.
    pub(crate) async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.get(path).await?;
        Self::decode_json(response).await
    }

    /// GET `<api_base>/<segments...>` with query parameters and decode the
    /// body as JSON.
    pub(crate) async fn get_json_with_query<Q: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        query: &Q,
    ) -> Result<Value> {
        let url = self.config.api_url_segments(segments)?;
        let response = self.get_with_query(url, query).await?;
        Self::decode_json(response).await
    }

    async fn decode_json(response: reqwest::Response) -> Result<Value> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Pass 2xx responses through; map anything else to a typed error.
    async fn handle_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "API request failed");
        Err(Error::from_status(status.as_u16(), body))
    }
}

impl Clone for MonzoClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for MonzoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonzoClient")
            .field("credentials", &self.inner.credentials)
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client() -> MonzoClient {
        let credentials = Credentials::new("client", "secret", "http://localhost:3456").unwrap();
        MonzoClient::new(credentials, ClientConfig::default().without_token_cache()).unwrap()
    }

    #[test]
    fn test_state_token_per_client() {
        let a = client();
        let b = client();
        assert_eq!(a.state_token().len(), auth::STATE_TOKEN_LEN);
        assert_eq!(a.state_token(), a.clone().state_token());
        assert_ne!(a.state_token(), b.state_token());
    }

    #[tokio::test]
    async fn test_get_requires_token() {
        let client = client();
        assert!(!client.is_authenticated().await);
        assert!(matches!(
            client.get("accounts").await,
            Err(Error::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_bearer_header() {
        let client = client();
        client
            .session()
            .install(SecretString::from("tok123".to_string()))
            .await;
        let headers = client.inner.build_headers().await.unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer tok123");
    }

    #[tokio::test]
    async fn test_restore_without_cache() {
        assert!(!client().restore_session().await.unwrap());
    }

    #[tokio::test]
    async fn test_retry_once_after_auth_failure() {
        let client = client();
        let calls = AtomicUsize::new(0);
        let reauths = AtomicUsize::new(0);

        let result = retry_after_reauthentication(
            &client,
            |_| {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(Error::from_status(401, "expired"))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            |_| {
                reauths.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(reauths.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_for_other_errors() {
        let client = client();
        let calls = AtomicUsize::new(0);
        let reauths = AtomicUsize::new(0);

        let result: Result<()> = retry_after_reauthentication(
            &client,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::from_status(404, "gone")) }
            },
            |_| {
                reauths.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reauths.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_failure_is_returned() {
        let client = client();

        let result: Result<()> = retry_after_reauthentication(
            &client,
            |_| async { Err(Error::from_status(401, "still expired")) },
            |_| async { Ok(()) },
        )
        .await;

        assert!(matches!(result, Err(Error::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_rejected_token_is_dropped_when_reauthentication_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache_path = dir.path().join("monzo.json");
        let credentials = Credentials::new("client", "secret", "http://localhost:3456").unwrap();
        let client = MonzoClient::new(
            credentials,
            ClientConfig::default().with_token_cache(&cache_path),
        )
        .unwrap();

        TokenCache::new(&cache_path)
            .store(&serde_json::json!({"access_token": "stale"}))
            .unwrap();
        assert!(client.restore_session().await.unwrap());

        let result: Result<()> = retry_after_reauthentication(
            &client,
            |_| async { Err(Error::from_status(401, "expired")) },
            |_| async { Err(Error::CallbackTimeout(std::time::Duration::from_secs(1))) },
        )
        .await;

        assert!(matches!(result, Err(Error::CallbackTimeout(_))));
        assert!(!client.is_authenticated().await);
        assert!(matches!(client.get("accounts").await, Err(Error::NotAuthenticated)));
        assert!(!client.restore_session().await.unwrap());
    }
}
