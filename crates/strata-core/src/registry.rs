//! Repository registry — the composition root.
//!
//! Holds exactly one repository instance per entity type and hands out typed
//! handles on demand. Constructed once at composition time and passed by
//! reference (or `Arc`) to whatever needs repository access; there is no
//! global singleton.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::entity::Entity;
use crate::errors::{Result, StorageError};
use crate::repository::Repository;

/// Type-erased lifecycle view of a registered repository.
///
/// Lets the registry fan out `initialize`/`dispose` without knowing the
/// entity type behind each entry.
#[async_trait]
trait RepositoryHandle: Send + Sync {
    async fn initialize(&self) -> Result<()>;
    async fn dispose(&self) -> Result<()>;
    fn entity_type(&self) -> &'static str;
}

struct EntityHandle<T: Entity> {
    repo: Arc<dyn Repository<T>>,
}

#[async_trait]
impl<T: Entity> RepositoryHandle for EntityHandle<T> {
    async fn initialize(&self) -> Result<()> {
        self.repo.initialize().await
    }

    async fn dispose(&self) -> Result<()> {
        self.repo.dispose().await
    }

    fn entity_type(&self) -> &'static str {
        type_name::<T>()
    }
}

struct RegistryEntry {
    /// Boxed `Arc<dyn Repository<T>>`, downcast by [`RepositoryRegistry::get`].
    repo: Box<dyn Any + Send + Sync>,
    handle: Arc<dyn RepositoryHandle>,
}

/// Maps each entity type to its one registered repository.
///
/// Registrations are made once at composition time; later registrations for
/// an already-registered type are ignored with a warning.
#[derive(Default)]
pub struct RepositoryRegistry {
    entries: Mutex<HashMap<TypeId, RegistryEntry>>,
}

impl RepositoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the repository for entity type `T`.
    ///
    /// At most one repository per type: a duplicate registration is ignored
    /// (the first one wins) and logged.
    pub fn register<T: Entity>(&self, repo: Arc<dyn Repository<T>>) {
        let mut entries = self.entries.lock();
        match entries.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => {
                warn!(entity = type_name::<T>(), "repository already registered, ignoring");
            }
            Entry::Vacant(slot) => {
                debug!(entity = type_name::<T>(), "repository registered");
                let _ = slot.insert(RegistryEntry {
                    repo: Box::new(Arc::clone(&repo)),
                    handle: Arc::new(EntityHandle { repo }),
                });
            }
        }
    }

    /// Initialize every registered repository concurrently.
    ///
    /// Best-effort fan-out: a failure in one repository is logged and does
    /// not halt the others. Returns the number of failures.
    pub async fn initialize_all(&self) -> usize {
        let handles: Vec<Arc<dyn RepositoryHandle>> = {
            let entries = self.entries.lock();
            entries.values().map(|e| Arc::clone(&e.handle)).collect()
        };

        let results = join_all(handles.iter().map(|h| h.initialize())).await;

        let mut failures = 0;
        for (handle, result) in handles.iter().zip(results) {
            if let Err(err) = result {
                error!(entity = handle.entity_type(), %err, "repository initialization failed");
                failures += 1;
            }
        }
        failures
    }

    /// Look up the repository registered for entity type `T`.
    pub fn get<T: Entity>(&self) -> Result<Arc<dyn Repository<T>>> {
        let entries = self.entries.lock();
        entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.repo.downcast_ref::<Arc<dyn Repository<T>>>())
            .cloned()
            .ok_or(StorageError::NotRegistered(type_name::<T>()))
    }

    /// Number of registered repositories.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the registry holds no registrations.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Dispose every registered repository and clear the registry.
    ///
    /// Disposal failures are logged, not propagated — teardown keeps going.
    pub async fn dispose(&self) {
        let handles: Vec<Arc<dyn RepositoryHandle>> = {
            let mut entries = self.entries.lock();
            entries.drain().map(|(_, e)| e.handle).collect()
        };

        for handle in handles {
            if let Err(err) = handle.dispose().await {
                error!(entity = handle.entity_type(), %err, "repository disposal failed");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::repository::Predicate;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Player {
        id: i64,
        name: String,
    }

    impl Entity for Player {
        type Id = i64;
        const COLLECTION: &'static str = "players";

        fn id(&self) -> i64 {
            self.id
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Guild {
        id: i64,
    }

    impl Entity for Guild {
        type Id = i64;
        const COLLECTION: &'static str = "guilds";

        fn id(&self) -> i64 {
            self.id
        }
    }

    /// In-memory repository that counts lifecycle calls.
    struct MemoryRepo<T: Entity> {
        items: Mutex<Vec<T>>,
        init_calls: AtomicUsize,
        dispose_calls: AtomicUsize,
        fail_init: bool,
    }

    impl<T: Entity> Default for MemoryRepo<T> {
        fn default() -> Self {
            Self {
                items: Mutex::new(Vec::new()),
                init_calls: AtomicUsize::new(0),
                dispose_calls: AtomicUsize::new(0),
                fail_init: false,
            }
        }
    }

    #[async_trait]
    impl<T: Entity> Repository<T> for MemoryRepo<T> {
        async fn initialize(&self) -> Result<()> {
            let _ = self.init_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                return Err(StorageError::Internal("boom".into()));
            }
            Ok(())
        }

        async fn get_by_id(&self, id: &T::Id) -> Result<Option<T>> {
            Ok(self.items.lock().iter().find(|e| e.id() == *id).cloned())
        }

        async fn get_all(&self) -> Result<Vec<T>> {
            Ok(self.items.lock().clone())
        }

        async fn find(&self, predicate: Predicate<T>) -> Result<Vec<T>> {
            Ok(self
                .items
                .lock()
                .iter()
                .filter(|e| predicate(*e))
                .cloned()
                .collect())
        }

        async fn insert(&self, entity: T) -> Result<T> {
            self.items.lock().push(entity.clone());
            Ok(entity)
        }

        async fn insert_many(&self, entities: Vec<T>) -> Result<Vec<T>> {
            self.items.lock().extend(entities.iter().cloned());
            Ok(entities)
        }

        async fn update(&self, entity: &T) -> Result<()> {
            let mut items = self.items.lock();
            if let Some(slot) = items.iter_mut().find(|e| e.id() == entity.id()) {
                *slot = entity.clone();
            }
            Ok(())
        }

        async fn update_many(&self, entities: &[T]) -> Result<()> {
            for entity in entities {
                let mut items = self.items.lock();
                if let Some(slot) = items.iter_mut().find(|e| e.id() == entity.id()) {
                    *slot = entity.clone();
                }
            }
            Ok(())
        }

        async fn delete(&self, entity: &T) -> Result<()> {
            self.items.lock().retain(|e| e.id() != entity.id());
            Ok(())
        }

        async fn save_changes(&self) -> Result<()> {
            Ok(())
        }

        async fn dispose(&self) -> Result<()> {
            let _ = self.dispose_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn register_and_get() {
        let registry = RepositoryRegistry::new();
        registry.register::<Player>(Arc::new(MemoryRepo::default()));

        let repo = registry.get::<Player>().unwrap();
        let inserted = repo
            .insert(Player {
                id: 1,
                name: "Hero".into(),
            })
            .await
            .unwrap();
        assert_eq!(repo.get_by_id(&1).await.unwrap(), Some(inserted));
    }

    #[tokio::test]
    async fn get_unregistered_type_fails() {
        let registry = RepositoryRegistry::new();
        registry.register::<Player>(Arc::new(MemoryRepo::default()));

        let err = registry.get::<Guild>().err().unwrap();
        assert!(matches!(err, StorageError::NotRegistered(_)));
    }

    #[tokio::test]
    async fn duplicate_registration_is_ignored() {
        let registry = RepositoryRegistry::new();
        let first: Arc<MemoryRepo<Player>> = Arc::new(MemoryRepo::default());
        registry.register::<Player>(first.clone());
        registry.register::<Player>(Arc::new(MemoryRepo::default()));
        assert_eq!(registry.len(), 1);

        // The first registration wins.
        let repo = registry.get::<Player>().unwrap();
        let _ = repo
            .insert(Player {
                id: 9,
                name: "First".into(),
            })
            .await
            .unwrap();
        assert_eq!(first.items.lock().len(), 1);
    }

    #[tokio::test]
    async fn initialize_all_fans_out() {
        let registry = RepositoryRegistry::new();
        let players: Arc<MemoryRepo<Player>> = Arc::new(MemoryRepo::default());
        let guilds: Arc<MemoryRepo<Guild>> = Arc::new(MemoryRepo::default());
        registry.register::<Player>(players.clone());
        registry.register::<Guild>(guilds.clone());

        let failures = registry.initialize_all().await;
        assert_eq!(failures, 0);
        assert_eq!(players.init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(guilds.init_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn initialize_all_continues_past_failures() {
        let registry = RepositoryRegistry::new();
        let failing: Arc<MemoryRepo<Player>> = Arc::new(MemoryRepo {
            fail_init: true,
            ..Default::default()
        });
        let guilds: Arc<MemoryRepo<Guild>> = Arc::new(MemoryRepo::default());
        registry.register::<Player>(failing);
        registry.register::<Guild>(guilds.clone());

        let failures = registry.initialize_all().await;
        assert_eq!(failures, 1);
        // The healthy repository still initialized.
        assert_eq!(guilds.init_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispose_clears_registry() {
        let registry = RepositoryRegistry::new();
        let players: Arc<MemoryRepo<Player>> = Arc::new(MemoryRepo::default());
        registry.register::<Player>(players.clone());

        registry.dispose().await;
        assert!(registry.is_empty());
        assert_eq!(players.dispose_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            registry.get::<Player>(),
            Err(StorageError::NotRegistered(_))
        ));
    }
}
