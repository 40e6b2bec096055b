//! Key-indexed repository — the full repository contract over a flat store.
//!
//! The backing [`KeyValueStore`] only understands single-key blobs, so
//! collection enumeration is emulated with a hand-maintained index: an
//! ordered list of record keys persisted under `Keys_<collection>` and
//! mirrored in memory behind an async mutex.
//!
//! Write ordering: the record commits first, the index second — a crash
//! between the two leaves an orphaned record, never a dangling index entry.
//! [`KeyIndexedRepository::initialize`] reconciles both directions by
//! scanning the store's record keys against the persisted index.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use strata_core::{Entity, Predicate, Repository, Result};

use crate::keys::{index_key, record_key, record_prefix};
use crate::store::KeyValueStore;

/// Repository adapter holding the per-collection key index.
pub struct KeyIndexedRepository<T: Entity> {
    store: Arc<dyn KeyValueStore>,
    /// In-memory mirror of the persisted index. All mutations hold this lock
    /// across both the store write and the index publish, so concurrent
    /// callers serialize per collection.
    index: Mutex<Vec<String>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> KeyIndexedRepository<T> {
    /// Create the adapter over `store`. Call
    /// [`initialize`](Repository::initialize) before first use.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            index: Mutex::new(Vec::new()),
            _entity: PhantomData,
        }
    }

    fn key_of(entity: &T) -> String {
        record_key(T::COLLECTION, &entity.id())
    }

    /// Persist `index` under the collection's well-known index key.
    async fn persist_index(&self, index: &[String]) -> Result<()> {
        let raw = serde_json::to_string(index)?;
        self.store.save(&index_key(T::COLLECTION), &raw).await
    }

    /// Load the persisted index, folding absence and corruption into empty.
    async fn load_persisted_index(&self) -> Result<Vec<String>> {
        match self.store.load(&index_key(T::COLLECTION)).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(keys) => Ok(keys),
                Err(err) => {
                    warn!(collection = T::COLLECTION, %err, "index record malformed, rebuilding");
                    Ok(Vec::new())
                }
            },
            None => Ok(Vec::new()),
        }
    }

    /// Deserialize one record, folding failure into `None` (quiet reads).
    fn parse_record(key: &str, raw: &str) -> Option<T> {
        match serde_json::from_str(raw) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(key, %err, "record malformed, skipping");
                None
            }
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for KeyIndexedRepository<T> {
    /// Load the persisted index and reconcile it against the store.
    ///
    /// Index entries whose record is gone are dropped; records missing from
    /// the index are appended. The repaired index is re-persisted only when
    /// something changed.
    async fn initialize(&self) -> Result<()> {
        let mut index = self.index.lock().await;
        let persisted = self.load_persisted_index().await?;
        let stored = self.store.list_keys(&record_prefix(T::COLLECTION)).await?;

        let mut reconciled: Vec<String> = persisted
            .iter()
            .filter(|key| stored.contains(*key))
            .cloned()
            .collect();
        for key in &stored {
            if !reconciled.contains(key) {
                warn!(collection = T::COLLECTION, key = %key, "orphaned record re-indexed");
                reconciled.push(key.clone());
            }
        }

        if reconciled != persisted {
            self.persist_index(&reconciled).await?;
        }
        debug!(
            collection = T::COLLECTION,
            entries = reconciled.len(),
            "key index loaded"
        );
        *index = reconciled;
        Ok(())
    }

    /// Direct key load — does not consult the index.
    async fn get_by_id(&self, id: &T::Id) -> Result<Option<T>> {
        let key = record_key(T::COLLECTION, id);
        match self.store.load(&key).await? {
            Some(raw) => Ok(Self::parse_record(&key, &raw)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        let keys = self.index.lock().await.clone();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut entities = Vec::with_capacity(keys.len());
        for key in &keys {
            // Records that fail to load or parse are skipped, not surfaced.
            if let Some(raw) = self.store.load(key).await?
                && let Some(entity) = Self::parse_record(key, &raw)
            {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// O(collection size) disk reads: every indexed record is loaded and the
    /// predicate applied in memory, preserving index order.
    async fn find(&self, predicate: Predicate<T>) -> Result<Vec<T>> {
        let keys = self.index.lock().await.clone();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        for key in &keys {
            if let Some(raw) = self.store.load(key).await?
                && let Some(entity) = Self::parse_record(key, &raw)
                && predicate(&entity)
            {
                matches.push(entity);
            }
        }
        Ok(matches)
    }

    /// Record first, index second — the index only ever references records
    /// that were confirmed written.
    async fn insert(&self, entity: T) -> Result<T> {
        let key = Self::key_of(&entity);
        let raw = serde_json::to_string(&entity)?;

        let mut index = self.index.lock().await;
        self.store.save(&key, &raw).await.map_err(|err| {
            error!(key = %key, %err, "record write failed");
            err
        })?;
        if !index.contains(&key) {
            index.push(key);
        }
        self.persist_index(&index).await.map_err(|err| {
            error!(collection = T::COLLECTION, %err, "index write failed");
            err
        })?;
        Ok(entity)
    }

    async fn insert_many(&self, entities: Vec<T>) -> Result<Vec<T>> {
        let mut inserted = Vec::with_capacity(entities.len());
        for entity in entities {
            inserted.push(self.insert(entity).await?);
        }
        Ok(inserted)
    }

    /// Overwrite in place. An entity that was never inserted is rejected:
    /// logged, no write, `Ok` — updates do not auto-create.
    async fn update(&self, entity: &T) -> Result<()> {
        let key = Self::key_of(entity);
        if !self.store.exists(&key).await? {
            warn!(key = %key, "update for unknown record, skipping");
            return Ok(());
        }
        let raw = serde_json::to_string(entity)?;
        self.store.save(&key, &raw).await.map_err(|err| {
            error!(key = %key, %err, "record update failed");
            err
        })
    }

    async fn update_many(&self, entities: &[T]) -> Result<()> {
        for entity in entities {
            self.update(entity).await?;
        }
        Ok(())
    }

    async fn delete(&self, entity: &T) -> Result<()> {
        let key = Self::key_of(entity);
        if !self.store.exists(&key).await? {
            return Ok(());
        }

        let mut index = self.index.lock().await;
        self.store.delete(&key).await.map_err(|err| {
            error!(key = %key, %err, "record delete failed");
            err
        })?;
        index.retain(|k| *k != key);
        self.persist_index(&index).await
    }

    /// Defensive flush: re-persist the in-memory index as-is.
    async fn save_changes(&self) -> Result<()> {
        let index = self.index.lock().await;
        self.persist_index(&index).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
