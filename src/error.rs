//! Error types for etcd-service-registry.

use std::time::Duration;

use crate::store::StoreError;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The call was rejected before touching the store.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No entries exist for the requested service.
    #[error("Service not found: {0}")]
    NotFound(String),

    /// Store call failed; the store error is kept as-is.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The per-call deadline elapsed before the store answered.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Service payload could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The registry does not implement this capability.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Connection to the store cluster could not be established.
    #[error("Connection error: {0}")]
    Connection(String),
}

impl Error {
    /// Create an invalid-argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a connection error.
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Whether this error is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
