//! Error types for the bridge crate.

use std::time::Duration;

use thunder_sf_composite::CompositeErrors;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bridge operations.
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

    /// Shorthand for a contract violation.
    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContractViolation(message.into()))
    }

    /// Returns true if the host broke its structural contract.
    ///
    /// These indicate a bug in the host integration, not a network problem,
    /// and are never worth retrying.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self.kind, ErrorKind::ContractViolation(_))
    }

    /// Returns true if the host rejected the call.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport(_))
    }

    /// Returns true if a composite call succeeded only partially.
    pub fn is_partial_batch(&self) -> bool {
        matches!(self.kind, ErrorKind::PartialBatch { .. })
    }

    /// Returns true if the wait for a host response ran out.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout { .. })
    }

    /// The raw response payload, present only for partial batch failures.
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.kind {
            ErrorKind::PartialBatch { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// The per-reference-id outcome of a partially failed composite call.
    pub fn composite_errors(&self) -> Option<&CompositeErrors> {
        match &self.kind {
            ErrorKind::PartialBatch { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The host rejected the call. The message is whatever the host reported.
    #[error("{0}")]
    Transport(String),

    /// A host-provided value broke a structural assumption.
    #[error("host contract violation: {0}")]
    ContractViolation(String),

    /// A composite call reported at least one failed sub-operation.
    ///
    /// The full response payload is kept so callers can apply the successful
    /// sub-operations.
    #[error("{errors}")]
    PartialBatch {
        payload: Vec<u8>,
        errors: CompositeErrors,
    },

    /// No callback fired within the configured timeout.
    #[error("no response from host after {waited:?}")]
    Timeout { waited: Duration },

    /// The dispatch worker died before registering callbacks.
    #[error("dispatch worker failed: {0}")]
    Worker(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::with_source(ErrorKind::Worker(err.to_string()), err)
    }
}
