//! Storage error types.

use quiverdb_core::{CoreError, ElementType, Id};
use thiserror::Error;

use crate::mutation::MutateAction;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened.
    #[error("failed to open database: {0}")]
    Open(String),

    /// A backend transaction error occurred.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The operation is not supported.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// A pending action can't be combined with a new one on the same element.
    #[error("the action '{new}' is incompatible with action '{existing}'")]
    IncompatibleAction {
        /// The action being added.
        new: MutateAction,
        /// The pending action it conflicts with.
        existing: MutateAction,
    },

    /// A partial update targeted a record that does not exist.
    #[error("no {element_type} record with id '{}'", .id.as_string().escape_debug())]
    NotFound {
        /// Category of the missing record.
        element_type: ElementType,
        /// Id of the missing record.
        id: Id,
    },

    /// An error reported by the underlying engine.
    #[error("internal storage error: {0}")]
    Internal(String),

    /// An error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StorageError {
    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Returns true for errors caused by the caller rather than the backend.
    #[must_use]
    pub const fn is_logic_error(&self) -> bool {
        matches!(self, Self::IncompatibleAction { .. } | Self::Core(CoreError::InvalidArgument(_)))
    }
}

impl From<bincode::error::EncodeError> for StorageError {
    fn from(err: bincode::error::EncodeError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for StorageError {
    fn from(err: bincode::error::DecodeError) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A specialized Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
