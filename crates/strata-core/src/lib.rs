//! # strata-core
//!
//! Backend-agnostic persistence contracts for the strata storage layer.
//!
//! Application code talks to a [`Repository`] — one per entity type — without
//! knowing whether an embedded SQL engine or a flat key-value store sits
//! underneath. The [`RepositoryRegistry`] is the composition root: it maps
//! each [`Entity`] type to its one registered repository, fans out
//! asynchronous initialization, and hands out typed lookups.
//!
//! Backend crates (`strata-sqlite`, `strata-kv`) provide the repository
//! implementations; this crate owns only the contracts and the shared
//! [`StorageError`] taxonomy.

pub mod entity;
pub mod errors;
pub mod registry;
pub mod repository;

pub use entity::Entity;
pub use errors::{Result, StorageError};
pub use registry::RepositoryRegistry;
pub use repository::{Predicate, Repository};
