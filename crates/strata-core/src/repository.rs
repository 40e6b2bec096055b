//! Backend-agnostic repository contract.
//!
//! One [`Repository`] instance serves one entity type. Implementations must
//! be safe to share behind an `Arc` — all methods take `&self` and the trait
//! is object safe, so callers hold `Arc<dyn Repository<T>>` without knowing
//! which backend is underneath.

use async_trait::async_trait;

use crate::entity::Entity;
use crate::errors::Result;

/// Typed filter applied by [`Repository::find`].
///
/// A plain boolean function of one entity — no query language, no expression
/// machinery. Backends are free to evaluate it wherever the entities live.
pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Uniform CRUD and query contract over one entity type.
///
/// Backends differ in failure style: SQL-backed repositories re-raise nearly
/// every engine error, while key-value-backed ones fold read failures into
/// "not found" (inspect logs to tell the difference). Write failures propagate
/// on both.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Prepare the repository for use (provision storage, load indexes).
    ///
    /// Must be called once before any other operation; implementations are
    /// idempotent so shared backends can be initialized through several
    /// repositories safely.
    async fn initialize(&self) -> Result<()>;

    /// Load one entity by identity, or `None` if absent.
    async fn get_by_id(&self, id: &T::Id) -> Result<Option<T>>;

    /// Load every entity in the collection.
    async fn get_all(&self) -> Result<Vec<T>>;

    /// Load the entities satisfying `predicate`, in collection order.
    async fn find(&self, predicate: Predicate<T>) -> Result<Vec<T>>;

    /// Persist a new entity, returning it with any backend-assigned identity
    /// populated.
    async fn insert(&self, entity: T) -> Result<T>;

    /// Persist a batch of new entities. SQL backends run the batch in a
    /// single transaction; a failure on any item rolls back the whole batch.
    async fn insert_many(&self, entities: Vec<T>) -> Result<Vec<T>>;

    /// Overwrite an existing entity. Updating an entity that was never
    /// inserted is rejected by key-value backends (logged, no write).
    async fn update(&self, entity: &T) -> Result<()>;

    /// Overwrite a batch of existing entities (transactional on SQL backends).
    async fn update_many(&self, entities: &[T]) -> Result<()>;

    /// Remove an entity, keyed by its identity.
    async fn delete(&self, entity: &T) -> Result<()>;

    /// Flush any repository-held state (e.g. a persisted key index) to
    /// storage. A no-op for backends without repository-held state.
    async fn save_changes(&self) -> Result<()>;

    /// Release resources held by this repository. Default: nothing to release.
    async fn dispose(&self) -> Result<()> {
        Ok(())
    }
}
