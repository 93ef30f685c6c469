//! Capability error types.

use std::time::Duration;

use crate::config::{CloudProvider, ConfigError};
use crate::emulator::EmulatorError;

/// Coarse classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The named resource does not exist.
    NotFound,
    /// The resource already exists (owned by the caller or in use).
    AlreadyExists,
    /// Throttling, timeouts and other failures worth retrying.
    Transient,
    /// Authorization, permission and other non-retryable failures.
    Fatal,
    /// The provider rejected a parameter.
    Argument,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
            ErrorKind::Argument => "invalid argument",
        };
        f.write_str(s)
    }
}

/// Errors returned by capability operations.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{operation} failed for '{resource}' ({kind}): {message}")]
    Provider {
        operation: &'static str,
        resource: String,
        kind: ErrorKind,
        code: Option<String>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{operation} of '{resource}' failed mid-pagination: {source}")]
    IncompleteRead {
        operation: &'static str,
        resource: String,
        #[source]
        source: Box<CapabilityError>,
    },

    #[error("Key schema unknown for table '{0}'; call ensure_table first")]
    UnknownTable(String),

    #[error("Table '{table}' not active after {waited:?}")]
    NotActive { table: String, waited: Duration },

    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),

    #[error("Adapter not initialized")]
    NotInitialized,

    #[error("No adapter registered for provider {0}")]
    NoAdapter(CloudProvider),

    #[error("Emulator error: {0}")]
    Emulator(#[from] EmulatorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CapabilityError {
    /// Classification of the failure, when it came from a provider call.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CapabilityError::Provider { kind, .. } => Some(*kind),
            CapabilityError::InvalidArgument(_) => Some(ErrorKind::Argument),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_retryable)
    }
}

pub type Result<T> = std::result::Result<T, CapabilityError>;
