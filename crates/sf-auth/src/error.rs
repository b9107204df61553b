//! Error types for sf-auth.
//!
//! Messages never carry token values.

/// Result type alias for sf-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sf-auth operations.
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

    /// Returns true if the login server refused the grant itself, as opposed
    /// to a network or parsing problem. Retrying will not help.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(&self.kind, ErrorKind::OAuth { error, .. } if error == "invalid_grant")
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// OAuth error response from Salesforce.
    #[error("OAuth error: {error} - {description}")]
    OAuth { error: String, description: String },

    /// JWT signing error.
    #[error("JWT error: {0}")]
    Jwt(String),

    /// The credentials on hand cannot support the requested operation.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// HTTP error during authentication.
    #[error("HTTP error: {0}")]
    Http(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Form encoding error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Environment variable not set.
    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    /// Salesforce CLI error.
    #[error("SF CLI error: {0}")]
    SfCli(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Token endpoints can echo credentials back in the URL.
        let message = err.to_string();
        let sanitized = if message.contains("access_token") || message.contains("token=") {
            "HTTP request failed (details redacted for security)".to_string()
        } else {
            message
        };
        Error::with_source(ErrorKind::Http(sanitized), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::Serialization(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::with_source(ErrorKind::Jwt(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        let err = ErrorKind::OAuth {
            error: "invalid_grant".to_string(),
            description: "expired access/refresh token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "OAuth error: invalid_grant - expired access/refresh token"
        );
        assert_eq!(
            ErrorKind::SfCli("org not found".into()).to_string(),
            "SF CLI error: org not found"
        );
    }

    #[test]
    fn test_is_invalid_grant() {
        let err = Error::new(ErrorKind::OAuth {
            error: "invalid_grant".to_string(),
            description: "expired".to_string(),
        });
        assert!(err.is_invalid_grant());

        let err = Error::new(ErrorKind::Http("connection refused".into()));
        assert!(!err.is_invalid_grant());
    }

    #[test]
    fn test_from_io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "sf: not found");
        let err: Error = io.into();
        assert!(matches!(err.kind, ErrorKind::Io(_)));
        assert!(err.source.is_some());
    }
}
