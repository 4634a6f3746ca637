//! Single-use local HTTP listener for the OAuth redirect.
//!
//! The provider redirects the browser to `redirect_uri?code=...&state=...`.
//! [`CallbackServer`] serves that one route with axum, answers the request
//! with a short page, and hands the decoded query string back to the
//! authentication flow. The server shuts down after the first redirect.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::client::Credentials;
use crate::{Error, Result};

/// Query parameters of the redirect, each name mapped to all its values.
pub type CallbackParams = HashMap<String, Vec<String>>;

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><title>Monzo Expenses</title></head>\
<body><p>Authentication complete. You can close this window.</p></body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html><html><head><title>Monzo Expenses</title></head>\
<body><p>The authorization redirect could not be read.</p></body></html>";

/// Something that can deliver the OAuth redirect parameters once.
///
/// Consuming `self` ties the listener's lifetime to a single call: whatever
/// resource backs it is released when the call returns.
pub trait CallbackListener {
    /// Wait for the redirect.
    ///
    /// Resolves to `Ok(None)` when a request arrived but could not be
    /// understood, and to [`Error::CallbackTimeout`] if nothing arrived within
    /// `timeout`.
    fn wait_for_call(
        self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<CallbackParams>>> + Send;
}

/// Local HTTP listener bound to the redirect URI's address.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use monzo_expenses::auth::{CallbackListener, CallbackServer};
///
/// # async fn example() -> monzo_expenses::Result<()> {
/// let server = CallbackServer::bind("127.0.0.1:3456".parse().unwrap()).await?;
/// if let Some(params) = server.wait_for_call(Duration::from_secs(300)).await? {
///     println!("code: {:?}", params.get("code"));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    path: String,
}

/// Slot the handler hands the first redirect through.
type Delivery = Arc<Mutex<Option<oneshot::Sender<Option<CallbackParams>>>>>;

impl CallbackServer {
    /// Bind the listener, serving the redirect on `/`.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(addr = %listener.local_addr()?, "OAuth callback listener bound");
        Ok(Self {
            listener,
            path: "/".to_string(),
        })
    }

    /// Bind on the host, port and path of the registered redirect URI.
    pub async fn for_redirect(credentials: &Credentials) -> Result<Self> {
        let mut server = Self::bind(credentials.callback_addr()).await?;
        server.path = credentials.callback_path().to_string();
        Ok(server)
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

impl CallbackListener for CallbackServer {
    fn wait_for_call(
        self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<CallbackParams>>> + Send {
        async move {
            let (params_tx, params_rx) = oneshot::channel();
            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let delivery: Delivery = Arc::new(Mutex::new(Some(params_tx)));

            let app = Router::new()
                .route(&self.path, get(handle_redirect))
                .with_state(delivery);

            let server = axum::serve(self.listener, app).with_graceful_shutdown(async move {
                stop_rx.await.ok();
            });
            let server = tokio::spawn(async move { server.await });

            let received = tokio::time::timeout(timeout, params_rx).await;

            // Lets the in-flight response finish, then releases the port.
            stop_tx.send(()).ok();
            let served = server.await.map_err(std::io::Error::other)?;

            match received {
                Ok(Ok(params)) => Ok(params),
                Ok(Err(_)) => {
                    served?;
                    Ok(None)
                }
                Err(_) => Err(Error::CallbackTimeout(timeout)),
            }
        }
    }
}

async fn handle_redirect(
    State(delivery): State<Delivery>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> (StatusCode, Html<&'static str>) {
    let params = match query {
        Ok(Query(pairs)) if !pairs.is_empty() => Some(group_params(pairs)),
        Ok(_) => None,
        Err(rejection) => {
            tracing::debug!(%rejection, "Unreadable OAuth callback query");
            None
        }
    };

    let Some(sender) = delivery.lock().ok().and_then(|mut slot| slot.take()) else {
        return (StatusCode::GONE, Html(FAILURE_PAGE));
    };
    tracing::debug!(understood = params.is_some(), "OAuth callback received");

    let response = match params {
        Some(_) => (StatusCode::OK, Html(SUCCESS_PAGE)),
        None => (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE)),
    };
    sender.send(params).ok();
    response
}

fn group_params(pairs: Vec<(String, String)>) -> CallbackParams {
    let mut params = CallbackParams::new();
    for (name, value) in pairs {
        params.entry(name).or_default().push(value);
    }
    params
}
