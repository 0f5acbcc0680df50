//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur in the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An argument was malformed or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The Snowflake worker observed the clock moving backwards.
    #[error("clock moved backwards, refusing to generate id for {} milliseconds", .last - .now)]
    ClockRegression {
        /// The timestamp of the last issued id.
        last: i64,
        /// The timestamp read from the clock.
        now: i64,
    },

    /// The operation is not supported by this component.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An encoding or decoding error occurred.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A lock guarding shared state was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl CoreError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Returns true if this is an invalid argument error.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
