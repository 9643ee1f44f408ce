//! Error types for the Keygate limiter.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for Keygate operations.
///
/// Denials and store failures carry the wait hint computed at decision time;
/// [`KeygateError::retry_after`] exposes it uniformly.
#[derive(Error, Debug)]
pub enum KeygateError {
    /// The policy denied this attempt.
    #[error("rate limit exceeded")]
    RateLimit {
        /// Time until the next attempt can succeed.
        retry_after: Duration,
    },

    /// The wait hint exceeded the configured timeout.
    #[error("timed out waiting for the next attempt slot")]
    Timeout,

    /// A backend operation failed; the decision could not be persisted.
    #[error("store error: {source}")]
    Store {
        /// Best-effort wait hint at the point of failure.
        retry_after: Duration,
        #[source]
        source: StoreError,
    },

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeygateError {
    /// The wait hint attached to this error, zero when none applies.
    pub fn retry_after(&self) -> Duration {
        match self {
            KeygateError::RateLimit { retry_after } | KeygateError::Store { retry_after, .. } => {
                *retry_after
            }
            _ => Duration::ZERO,
        }
    }
}

impl From<StoreError> for KeygateError {
    fn from(source: StoreError) -> Self {
        KeygateError::Store {
            retry_after: Duration::ZERO,
            source,
        }
    }
}

/// Result type alias for Keygate operations.
pub type Result<T> = std::result::Result<T, KeygateError>;
