//! Bearer-token state shared by every service handle.

use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where a client stands in the OAuth flow.
///
/// There is no refresh: once a token stops working the only way back to
/// [`AuthState::Authenticated`] is another interactive authorization.
#[derive(Clone, Default)]
pub enum AuthState {
    /// No access token has been obtained yet
    #[default]
    Unauthenticated,
    /// An access token is installed and sent with every request
    Authenticated {
        /// Bearer token returned by the token endpoint
        access_token: SecretString,
    },
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => f.write_str("Unauthenticated"),
            AuthState::Authenticated { .. } => f
                .debug_struct("Authenticated")
                .field("access_token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Authentication session for the Monzo API.
///
/// # Thread Safety
///
/// `Session` is cheap to clone and shared between the client and its
/// services. Requests only take the read lock; the write lock is held just
/// long enough to install or drop a token.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<AuthState>>,
}

impl Session {
    /// Create an unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session that already holds an access token.
    pub fn with_access_token(access_token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AuthState::Authenticated {
                access_token: SecretString::from(access_token.into()),
            })),
        }
    }

    /// Returns `true` once an access token is installed.
    pub async fn is_authenticated(&self) -> bool {
        matches!(*self.inner.read().await, AuthState::Authenticated { .. })
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> AuthState {
        self.inner.read().await.clone()
    }

    /// Get the current access token, if any.
    pub(crate) async fn access_token(&self) -> Option<SecretString> {
        match &*self.inner.read().await {
            AuthState::Authenticated { access_token } => Some(access_token.clone()),
            AuthState::Unauthenticated => None,
        }
    }

    /// Install a freshly obtained access token.
    pub(crate) async fn install(&self, access_token: SecretString) {
        *self.inner.write().await = AuthState::Authenticated { access_token };
    }

    /// Forget the access token.
    pub async fn sign_out(&self) {
        *self.inner.write().await = AuthState::Unauthenticated;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &"...")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
