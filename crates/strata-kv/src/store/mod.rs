//! String-keyed blob storage primitive.
//!
//! [`KeyValueStore`] is the boundary the key-indexed repository builds on:
//! save/load/delete/exists keyed by string, plus a prefix scan used for index
//! reconciliation. Two interchangeable backends ship here — one file per key
//! ([`FileKeyValueStore`]) and a single preference-style map file
//! ([`PrefsStore`]).
//!
//! Read-path failures are deliberately quiet: backends log and report `None`
//! (or `false`/empty), so callers cannot distinguish "not found" from "failed
//! to read" without the logs. Write and delete failures propagate.

pub mod file;
pub mod prefs;

use async_trait::async_trait;
use strata_core::Result;

pub use file::FileKeyValueStore;
pub use prefs::PrefsStore;

/// Byte/string-level persistence primitive keyed by string.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Persist `value` under `key`, overwriting any previous value.
    async fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Load the value under `key`. `None` when absent — or unreadable (the
    /// failure is logged, not raised).
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Remove the value under `key`. Removing an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Whether a value exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// All stored keys starting with `prefix`, sorted.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}
