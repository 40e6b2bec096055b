//! SQL repository adapter — pure delegation onto the connection manager.
//!
//! No independent state or policy: every contract method forwards 1:1 to the
//! corresponding [`SqlConnectionManager`] operation. The SQL-specialized
//! surface (raw queries, transactions) is exposed as inherent methods.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Transaction;
use rusqlite::types::Value;

use strata_core::{Predicate, Repository, Result};

use crate::manager::SqlConnectionManager;
use crate::record::SqlRecord;

/// Repository over one table, backed by a shared connection manager.
pub struct SqlRepository<T: SqlRecord> {
    manager: Arc<SqlConnectionManager>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: SqlRecord> SqlRepository<T> {
    /// Adapter over `manager`. Several repositories share one manager — one
    /// physical database, one pool.
    pub fn new(manager: Arc<SqlConnectionManager>) -> Self {
        Self {
            manager,
            _entity: PhantomData,
        }
    }

    /// The backing connection manager.
    pub fn manager(&self) -> &Arc<SqlConnectionManager> {
        &self.manager
    }

    /// Raw query pass-through, decoding rows through `T`'s select order.
    pub async fn execute_query(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<Vec<T>> {
        self.manager.query(sql, params).await
    }

    /// Transaction pass-through: commit on `Ok`, roll back on `Err`.
    pub async fn run_in_transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.manager.run_in_transaction(f).await
    }
}

#[async_trait]
impl<T: SqlRecord> Repository<T> for SqlRepository<T> {
    async fn initialize(&self) -> Result<()> {
        self.manager.start().await
    }

    async fn get_by_id(&self, id: &T::Id) -> Result<Option<T>> {
        self.manager.find_by_id(id).await
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        self.manager.find_all().await
    }

    async fn find(&self, predicate: Predicate<T>) -> Result<Vec<T>> {
        self.manager.find_where(predicate).await
    }

    async fn insert(&self, entity: T) -> Result<T> {
        self.manager.insert(entity).await
    }

    async fn insert_many(&self, entities: Vec<T>) -> Result<Vec<T>> {
        self.manager.insert_many(entities).await
    }

    async fn update(&self, entity: &T) -> Result<()> {
        self.manager.update(entity).await
    }

    async fn update_many(&self, entities: &[T]) -> Result<()> {
        self.manager.update_many(entities).await
    }

    async fn delete(&self, entity: &T) -> Result<()> {
        self.manager.delete::<T>(&entity.id()).await
    }

    /// Nothing to flush — every mutation already hit the engine.
    async fn save_changes(&self) -> Result<()> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
