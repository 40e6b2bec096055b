//! Entity contract shared by every backend.
//!
//! An [`Entity`] is any record type with a typed identity that is unique
//! within its logical collection. Identity is either assigned by the caller
//! before insert or generated by the SQL engine on insert; repositories never
//! inspect entity fields beyond the identity.

use std::fmt::Display;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A persistable record with a typed identity.
///
/// `COLLECTION` names the logical collection the entity belongs to — the SQL
/// table name for SQL-backed repositories, the key prefix for key-value-backed
/// ones. `Id` must render through [`Display`] so key-value backends can derive
/// storage keys from it.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identity type, unique within the collection.
    type Id: Clone + Display + PartialEq + Send + Sync + 'static;

    /// Logical collection name (table name / key prefix).
    const COLLECTION: &'static str;

    /// The entity's identity value.
    fn id(&self) -> Self::Id;
}
