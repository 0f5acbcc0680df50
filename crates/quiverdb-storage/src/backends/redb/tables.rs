//! Redb table definition and key encoding.
//!
//! Redb requires static table names, so every logical store shares one
//! physical table and prefixes its keys with its own name. A record key is:
//!
//! `<store name> 0x00 <element type code> <id bytes>`
//!
//! Records of one store and one element type are therefore contiguous and
//! ordered by id bytes.

use quiverdb_core::{ElementType, Id};
use redb::TableDefinition;

/// The physical table that stores every record.
pub const DATA_TABLE: TableDefinition<'static, &[u8], &[u8]> = TableDefinition::new("quiver_data");

/// Separator byte between store name and record key.
pub const KEY_SEPARATOR: u8 = 0x00;

/// Encode a logical store name and key into a physical key.
pub fn encode_key(store: &str, key: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(store.len() + 1 + key.len());
    encoded.extend_from_slice(store.as_bytes());
    encoded.push(KEY_SEPARATOR);
    encoded.extend_from_slice(key);
    encoded
}

/// Encode the physical key of one record.
pub fn record_key(store: &str, element_type: ElementType, id: &Id) -> Vec<u8> {
    let id = id.as_bytes();
    let mut key = Vec::with_capacity(1 + id.len());
    key.push(element_type.code());
    key.extend_from_slice(&id);
    encode_key(store, &key)
}

/// The half-open key range holding every record of one element type.
pub fn type_range(store: &str, element_type: ElementType) -> (Vec<u8>, Vec<u8>) {
    let code = element_type.code();
    (encode_key(store, &[code]), encode_key(store, &[code + 1]))
}

/// Create the start key for range scans on a logical store.
pub fn store_start_key(store: &str) -> Vec<u8> {
    encode_key(store, &[])
}

/// Create the end key for range scans on a logical store.
/// This is the first key that would NOT belong to the store.
pub fn store_end_key(store: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(store.len() + 1);
    key.extend_from_slice(store.as_bytes());
    key.push(KEY_SEPARATOR + 1);
    key
}
