//! Error types for the Monzo API client.
//!
//! A single [`Error`] enum covers every failure mode of the crate: payload
//! deserialization, HTTP status failures reported by the API, and the
//! interactive OAuth flow.

use std::time::Duration;

use thiserror::Error;

/// A specialized `Result` type for Monzo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all Monzo API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A timestamp matched neither of the accepted formats
    #[error("Malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    /// An account `type` code with no known mapping
    #[error("Unknown account type: {0:?}")]
    UnknownAccountType(String),

    /// 400
    #[error("Bad request ({status}): {body}")]
    BadRequest {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// 401
    #[error("Unauthorized ({status}): {body}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// 403
    #[error("Forbidden ({status}): {body}")]
    Forbidden {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// 404
    #[error("Not found ({status}): {body}")]
    NotFound {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// 405
    #[error("Method not allowed ({status}): {body}")]
    MethodNotAllowed {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// 406
    #[error("Not acceptable ({status}): {body}")]
    NotAcceptable {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// 429
    #[error("Too many requests ({status}): {body}")]
    TooManyRequests {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// 500
    #[error("Internal server error ({status}): {body}")]
    InternalServerError {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// 504
    #[error("Gateway timeout ({status}): {body}")]
    GatewayTimeout {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Any other non-2xx response
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The `state` echoed by the OAuth redirect was missing, repeated, or wrong
    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),

    /// The OAuth redirect carried no authorization code
    #[error("OAuth redirect did not include an authorization code")]
    MissingAuthorizationCode,

    /// The OAuth redirect could not be read from the callback request
    #[error("OAuth callback request was malformed")]
    InvalidCallback,

    /// No OAuth redirect arrived within the configured window
    #[error("Timed out after {0:?} waiting for the OAuth callback")]
    CallbackTimeout(Duration),

    /// An API call was attempted before authenticating
    #[error("Client is not authenticated")]
    NotAuthenticated,

    /// The authorization URL could not be opened in a browser
    #[error("Could not open browser: {0}")]
    BrowserLaunch(String),

    /// Invalid input provided to a function
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Map a non-success HTTP status and its body text to a typed error.
    ///
    /// # Example
    ///
    /// ```
    /// use monzo_expenses::Error;
    ///
    /// let err = Error::from_status(404, "no such transaction");
    /// assert!(matches!(err, Error::NotFound { status: 404, .. }));
    /// ```
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            400 => Error::BadRequest { status, body },
            401 => Error::Unauthorized { status, body },
            403 => Error::Forbidden { status, body },
            404 => Error::NotFound { status, body },
            405 => Error::MethodNotAllowed { status, body },
            406 => Error::NotAcceptable { status, body },
            429 => Error::TooManyRequests { status, body },
            500 => Error::InternalServerError { status, body },
            504 => Error::GatewayTimeout { status, body },
            _ => Error::Api { status, body },
        }
    }

    /// The HTTP status carried by transport errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::BadRequest { status, .. }
            | Error::Unauthorized { status, .. }
            | Error::Forbidden { status, .. }
            | Error::NotFound { status, .. }
            | Error::MethodNotAllowed { status, .. }
            | Error::NotAcceptable { status, .. }
            | Error::TooManyRequests { status, .. }
            | Error::InternalServerError { status, .. }
            | Error::GatewayTimeout { status, .. }
            | Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The response body text carried by transport errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::BadRequest { body, .. }
            | Error::Unauthorized { body, .. }
            | Error::Forbidden { body, .. }
            | Error::NotFound { body, .. }
            | Error::MethodNotAllowed { body, .. }
            | Error::NotAcceptable { body, .. }
            | Error::TooManyRequests { body, .. }
            | Error::InternalServerError { body, .. }
            | Error::GatewayTimeout { body, .. }
            | Error::Api { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Returns `true` if the caller should re-run the OAuth flow and retry.
    ///
    /// The API answers an expired token with either 401 or 400.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized { .. } | Error::BadRequest { .. } | Error::NotAuthenticated
        )
    }

    /// Returns `true` if this error indicates a server-side issue.
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }
}
