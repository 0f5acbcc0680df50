//! Error types for `QuiverDB`.
//!
//! This module provides the [`enum@Error`] type returned by transactions,
//! configuration loading and the [`Graph`](crate::Graph) facade. Core and
//! storage errors are mapped onto it so callers match on one taxonomy.

use quiverdb_core::{CoreError, ElementType};
use quiverdb_storage::StorageError;
use thiserror::Error;

/// Errors that can occur when using `QuiverDB`.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument was malformed or violates the schema.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A query named neither an id nor a condition.
    #[error("query must carry an id or a condition")]
    EmptyQuery,

    /// Two writes to the same record can't be combined.
    #[error("the action '{new}' is incompatible with action '{existing}'")]
    IncompatibleAction {
        /// The action being added.
        new: String,
        /// The pending action it conflicts with.
        existing: String,
    },

    /// The Snowflake worker observed the clock moving backwards.
    #[error("clock moved backwards, refusing to generate id for {} milliseconds", .last - .now)]
    ClockRegression {
        /// The timestamp of the last issued id.
        last: i64,
        /// The timestamp read from the clock.
        now: i64,
    },

    /// A schema element or graph element does not exist.
    #[error("{element_type} '{name}' does not exist")]
    NotFound {
        /// The category looked up.
        element_type: ElementType,
        /// The name or id looked up.
        name: String,
    },

    /// The operation is not supported by the configured components.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A configuration error occurred.
    #[error("configuration error: {0}")]
    Config(String),

    /// A backend store failed.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// A commit failed and the transaction was rolled back.
    #[error("commit failed: {source}")]
    CommitFailed {
        /// The error that made the commit fail.
        #[source]
        source: Box<Error>,
    },

    /// An internal lock was poisoned (a thread panicked while holding it).
    #[error("internal lock poisoned: {0}")]
    LockPoisoned(String),
}

impl Error {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(element_type: ElementType, name: impl Into<String>) -> Self {
        Self::NotFound { element_type, name: name.into() }
    }

    /// Create a config error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wraps `cause` as the reason a commit failed.
    #[must_use]
    pub fn commit_failed(cause: Self) -> Self {
        Self::CommitFailed { source: Box::new(cause) }
    }

    /// Returns the innermost error, looking through [`Error::CommitFailed`].
    #[must_use]
    pub fn cause(&self) -> &Self {
        match self {
            Self::CommitFailed { source } => source.cause(),
            other => other,
        }
    }

    /// Returns `true` if this is an invalid argument or empty query error.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::EmptyQuery)
    }

    /// Returns `true` if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a mutation conflict.
    #[must_use]
    pub const fn is_incompatible_action(&self) -> bool {
        matches!(self, Self::IncompatibleAction { .. })
    }

    /// Returns `true` if this error ended a commit.
    #[must_use]
    pub const fn is_commit_failure(&self) -> bool {
        matches!(self, Self::CommitFailed { .. })
    }

    /// Returns `true` if this is a storage error.
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<CoreError> for Error {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidArgument(msg) | CoreError::Encoding(msg) => Self::InvalidArgument(msg),
            CoreError::ClockRegression { last, now } => Self::ClockRegression { last, now },
            CoreError::Unsupported(msg) => Self::Unsupported(msg),
            CoreError::LockPoisoned(msg) => Self::LockPoisoned(msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::IncompatibleAction { new, existing } => {
                Self::IncompatibleAction { new: new.to_string(), existing: existing.to_string() }
            }
            StorageError::NotFound { element_type, id } => {
                Self::NotFound { element_type, name: id.as_string() }
            }
            StorageError::Core(e) => e.into(),
            other => Self::Storage(other),
        }
    }
}

/// A specialized Result type for `QuiverDB` operations.
pub type Result<T> = std::result::Result<T, Error>;
