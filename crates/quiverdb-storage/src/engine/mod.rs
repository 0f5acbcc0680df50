//! Backend store traits and abstractions.
//!
//! This module defines what a backend store must provide:
//!
//! - [`BackendStore`] - Executes queries and applies conflict-resolved mutations
//!   inside backend transactions
//! - [`EntrySource`] - Point and scan access to stored records, from which
//!   [`execute`] derives full query evaluation
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`] which is an alias for
//! `Result<T, StorageError>`. See [`StorageError`] for the possible error variants.

mod error;
mod select;
mod traits;

pub use error::{StorageError, StorageResult};
pub use select::{apply_item, execute, EntrySource};
pub use traits::BackendStore;
