//! Derived storage-key scheme shared by the key-indexed repository.
//!
//! Records live under `"<collection>_<id>"`; the ordered key list for a
//! collection lives under `"Keys_<collection>"`.

use std::fmt::Display;

/// Storage key for one record.
pub fn record_key(collection: &str, id: &impl Display) -> String {
    format!("{collection}_{id}")
}

/// Prefix matching every record key of a collection.
pub fn record_prefix(collection: &str) -> String {
    format!("{collection}_")
}

/// Storage key for a collection's persisted key index.
pub fn index_key(collection: &str) -> String {
    format!("Keys_{collection}")
}
