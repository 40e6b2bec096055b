//! # strata-sqlite
//!
//! Resource-managed SQLite backend for the strata storage layer.
//!
//! [`SqlConnectionManager`] owns a bounded pool of connections to one
//! database file: acquisition suspends on a counting admission gate, work
//! runs off the caller's context, and every acquire pairs with exactly one
//! release. First-run provisioning copies a packaged [`SeedSource`]
//! byte-for-byte to the writable path, degrading to an empty database when
//! no seed is reachable.
//!
//! [`SqlRepository`] adapts the manager onto the backend-agnostic
//! [`strata_core::Repository`] contract for any entity implementing
//! [`SqlRecord`]. Errors on this backend are loud: engine failures are
//! logged and re-raised to the caller.

pub mod config;
pub mod manager;
pub mod pool;
pub mod record;
pub mod repository;
pub mod seed;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{DatabaseConfig, PoolConfig, apply_env_overrides};
pub use manager::SqlConnectionManager;
pub use pool::Pool;
pub use record::SqlRecord;
pub use repository::SqlRepository;
pub use seed::{EmbeddedSeed, FileSeed, SeedSource};
