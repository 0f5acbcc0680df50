//! Backend store implementations.
//!
//! - [`InMemoryStore`] - Ordered map, nothing persisted
//! - [`RedbStore`] - Durable store on top of Redb

mod memory;
pub mod redb;

pub use memory::InMemoryStore;
pub use self::redb::RedbStore;
