//! # strata-kv
//!
//! Key-value storage backends and the key-indexed repository adapter.
//!
//! A [`KeyValueStore`] only understands single-key blobs, so
//! [`KeyIndexedRepository`] emulates collection enumeration with a
//! hand-maintained ordered key index persisted alongside the records
//! (`Keys_<collection>`). Two store backends ship here: one file per key
//! ([`FileKeyValueStore`]) and a preference-style single map file
//! ([`PrefsStore`]).
//!
//! Error style on this backend is quiet on reads (log + empty result) and
//! loud on writes, the opposite of `strata-sqlite` — see
//! [`strata_core::StorageError`] for the shared taxonomy.

pub mod keys;
pub mod repository;
pub mod store;

pub use repository::KeyIndexedRepository;
pub use store::{FileKeyValueStore, KeyValueStore, PrefsStore};
