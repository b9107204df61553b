//! Error types for the recovery proxy.
//!
//! Every error maps to the HTTP status the caller of the proxy sees.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for proxy operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// HTTP status reported to the proxy's caller.
    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Upstream(_) | ErrorKind::Refresh(_) | ErrorKind::Unauthorized => {
                StatusCode::BAD_GATEWAY
            }
            ErrorKind::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::BodyRead(_) | ErrorKind::Config(_) | ErrorKind::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns true if the session could not be recovered.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Refresh(_) | ErrorKind::Unauthorized)
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The upstream request could not be completed.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Renewing the session failed.
    #[error("Error renewing session: {0}")]
    Refresh(String),

    /// The upstream rejected the request again after a refresh.
    #[error("upstream rejected the refreshed session")]
    Unauthorized,

    /// The inbound body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The inbound body could not be read.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "proxy request failed");
        }
        (status, self.to_string()).into_response()
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::with_source(ErrorKind::Upstream(err.to_string()), err)
    }
}

impl From<thunder_sf_auth::Error> for Error {
    fn from(err: thunder_sf_auth::Error) -> Self {
        Error::with_source(ErrorKind::Refresh(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}
