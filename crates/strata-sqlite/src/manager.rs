//! Resource-managed SQLite access: bootstrap, typed CRUD, transactions.
//!
//! [`SqlConnectionManager`] owns the bounded connection pool and guarantees
//! eventual database availability: on first run the writable file is
//! materialized from a packaged seed asset (or created empty when no seed is
//! reachable), then the pool is pre-warmed with the configured minimum of
//! connections.
//!
//! Every operation acquires one pooled connection, performs its work off the
//! caller's context, and releases the connection before returning or
//! propagating a failure. Engine errors are logged here and re-raised —
//! callers of the SQL path must handle them.

use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction, params_from_iter};
use tracing::{debug, error, info, warn};

use strata_core::{Predicate, Result, StorageError};

use crate::config::DatabaseConfig;
use crate::pool::Pool;
use crate::record::{self, SqlRecord};
use crate::seed::{SeedSource, copy_seed};

/// Map an engine error into the shared taxonomy. Constraint-class failures
/// get their own variant so callers can tell a rejected write from a broken
/// engine.
pub(crate) fn map_sql_err(err: rusqlite::Error) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Constraint(err.to_string())
        }
        _ => StorageError::Database(err.to_string()),
    }
}

/// Log-and-reraise helper for operation failures.
fn log_fail(op: &'static str, table: &'static str) -> impl FnOnce(StorageError) -> StorageError {
    move |err| {
        error!(op, table, %err, "database operation failed");
        err
    }
}

/// Pooled, transactional access to one SQLite database file.
pub struct SqlConnectionManager {
    config: DatabaseConfig,
    seed: Option<Arc<dyn SeedSource>>,
    pool: Pool,
    started: AtomicBool,
    start_lock: tokio::sync::Mutex<()>,
}

impl SqlConnectionManager {
    /// Manager without a seed asset: a missing database file is created
    /// empty on [`start`](SqlConnectionManager::start).
    pub fn new(config: DatabaseConfig) -> Self {
        Self::build(config, None)
    }

    /// Manager with a packaged seed asset to copy on first run.
    pub fn with_seed(config: DatabaseConfig, seed: Arc<dyn SeedSource>) -> Self {
        Self::build(config, Some(seed))
    }

    fn build(config: DatabaseConfig, seed: Option<Arc<dyn SeedSource>>) -> Self {
        let pool = Pool::new(config.path.clone(), config.pool.clone());
        Self {
            config,
            seed,
            pool,
            started: AtomicBool::new(false),
            start_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The pool, exposed for instrumentation.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Config in effect.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────────────────

    /// Provision the database file if absent and pre-warm the pool.
    ///
    /// Idempotent; concurrent callers serialize. On failure the manager is
    /// left non-functional — every subsequent operation fails — rather than
    /// retried automatically.
    pub async fn start(&self) -> Result<()> {
        let _guard = self.start_lock.lock().await;
        if self.started.load(Ordering::Acquire) {
            return Ok(());
        }

        let exists = tokio::fs::try_exists(&self.config.path).await.unwrap_or(false);
        if !exists {
            self.provision().await.map_err(|err| {
                error!(path = %self.config.path.display(), %err, "database bootstrap failed");
                err
            })?;
        }

        let warmed = self.pool.prewarm().await.map_err(|err| {
            error!(%err, "connection prewarm failed");
            err
        })?;

        info!(path = %self.config.path.display(), warmed, "database started");
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    /// Materialize the database file: seed copy, or an empty database when
    /// the seed is absent (degrade-gracefully, not fatal).
    async fn provision(&self) -> Result<()> {
        let Some(seed) = &self.seed else {
            debug!("no seed configured, creating empty database");
            return self.create_empty().await;
        };

        let seed = Arc::clone(seed);
        let dest = self.config.path.clone();
        let copied = tokio::task::spawn_blocking(move || copy_seed(seed.as_ref(), &dest))
            .await
            .map_err(|err| StorageError::Internal(format!("bootstrap task failed: {err}")))?;

        match copied {
            Ok(bytes) => {
                info!(bytes, path = %self.config.path.display(), "database provisioned from seed asset");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(%err, "seed asset missing, creating empty database");
                self.create_empty().await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Open and immediately release a connection with create-if-missing
    /// semantics.
    async fn create_empty(&self) -> Result<()> {
        let path = self.config.path.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(&path).map_err(StorageError::connection)?;
            drop(conn);
            Ok(())
        })
        .await
        .map_err(|err| StorageError::Internal(format!("bootstrap task failed: {err}")))?
    }

    /// Run `f` on a pooled connection, provided the manager has started.
    async fn with_connection<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        if !self.started.load(Ordering::Acquire) {
            return Err(StorageError::connection("database not started"));
        }
        self.pool.with_connection(f).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Typed CRUD
    // ─────────────────────────────────────────────────────────────────────

    /// Load one record by identity.
    pub async fn find_by_id<T: SqlRecord>(&self, id: &T::Id) -> Result<Option<T>> {
        let id = T::id_param(id);
        self.with_connection(move |conn| {
            let sql = format!("{} WHERE {} = ?1", record::select_sql::<T>(), T::ID_COLUMN);
            let mut stmt = conn.prepare(&sql).map_err(map_sql_err)?;
            stmt.query_row([id], T::from_row)
                .optional()
                .map_err(map_sql_err)
        })
        .await
        .map_err(log_fail("find_by_id", T::TABLE))
    }

    /// Load every record in the table.
    pub async fn find_all<T: SqlRecord>(&self) -> Result<Vec<T>> {
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare(&record::select_sql::<T>())
                .map_err(map_sql_err)?;
            let rows = stmt.query_map([], T::from_row).map_err(map_sql_err)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(map_sql_err)?);
            }
            Ok(out)
        })
        .await
        .map_err(log_fail("find_all", T::TABLE))
    }

    /// Load the records satisfying `predicate` — a full scan with a typed
    /// filter applied off the caller's context.
    pub async fn find_where<T: SqlRecord>(&self, predicate: Predicate<T>) -> Result<Vec<T>> {
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare(&record::select_sql::<T>())
                .map_err(map_sql_err)?;
            let rows = stmt.query_map([], T::from_row).map_err(map_sql_err)?;
            let mut out = Vec::new();
            for row in rows {
                let entity = row.map_err(map_sql_err)?;
                if predicate(&entity) {
                    out.push(entity);
                }
            }
            Ok(out)
        })
        .await
        .map_err(log_fail("find_where", T::TABLE))
    }

    /// Insert one record, returning it with any engine-assigned identity
    /// (last-insert-row semantics) populated.
    pub async fn insert<T: SqlRecord>(&self, entity: T) -> Result<T> {
        self.with_connection(move |conn| {
            let engine_assigns = entity.id_value().is_none();
            let (sql, params) = record::insert_sql(&entity);
            let _ = conn
                .execute(&sql, params_from_iter(params))
                .map_err(map_sql_err)?;
            let mut entity = entity;
            if engine_assigns {
                entity.assign_rowid(conn.last_insert_rowid());
            }
            Ok(entity)
        })
        .await
        .map_err(log_fail("insert", T::TABLE))
    }

    /// Insert a batch inside a single transaction: all rows commit together
    /// or none do, and the write cost is amortized.
    pub async fn insert_many<T: SqlRecord>(&self, entities: Vec<T>) -> Result<Vec<T>> {
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_err)?;
            let mut out = Vec::with_capacity(entities.len());
            for entity in entities {
                let engine_assigns = entity.id_value().is_none();
                let (sql, params) = record::insert_sql(&entity);
                let _ = tx
                    .execute(&sql, params_from_iter(params))
                    .map_err(map_sql_err)?;
                let mut entity = entity;
                if engine_assigns {
                    entity.assign_rowid(tx.last_insert_rowid());
                }
                out.push(entity);
            }
            tx.commit().map_err(map_sql_err)?;
            Ok(out)
        })
        .await
        .map_err(log_fail("insert_many", T::TABLE))
    }

    /// Overwrite one record, keyed by its identity.
    pub async fn update<T: SqlRecord>(&self, entity: &T) -> Result<()> {
        let (sql, params) = record::update_sql(entity);
        self.with_connection(move |conn| {
            let affected = conn
                .execute(&sql, params_from_iter(params))
                .map_err(map_sql_err)?;
            if affected == 0 {
                debug!(table = T::TABLE, "update matched no row");
            }
            Ok(())
        })
        .await
        .map_err(log_fail("update", T::TABLE))
    }

    /// Overwrite a batch inside a single transaction.
    pub async fn update_many<T: SqlRecord>(&self, entities: &[T]) -> Result<()> {
        let statements: Vec<(String, Vec<Value>)> =
            entities.iter().map(record::update_sql).collect();
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_err)?;
            for (sql, params) in statements {
                let _ = tx
                    .execute(&sql, params_from_iter(params))
                    .map_err(map_sql_err)?;
            }
            tx.commit().map_err(map_sql_err)?;
            Ok(())
        })
        .await
        .map_err(log_fail("update_many", T::TABLE))
    }

    /// Delete one record by identity.
    pub async fn delete<T: SqlRecord>(&self, id: &T::Id) -> Result<()> {
        let id = T::id_param(id);
        self.with_connection(move |conn| {
            let _ = conn
                .execute(&record::delete_sql::<T>(), [id])
                .map_err(map_sql_err)?;
            Ok(())
        })
        .await
        .map_err(log_fail("delete", T::TABLE))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Raw SQL and transactions
    // ─────────────────────────────────────────────────────────────────────

    /// Run an arbitrary query, decoding rows through `T`'s select order.
    pub async fn query<T: SqlRecord>(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<Vec<T>> {
        let sql = sql.into();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(map_sql_err)?;
            let rows = stmt
                .query_map(params_from_iter(params), T::from_row)
                .map_err(map_sql_err)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(map_sql_err)?);
            }
            Ok(out)
        })
        .await
        .map_err(log_fail("query", T::TABLE))
    }

    /// Run an arbitrary non-query statement, returning affected rows.
    pub async fn execute(&self, sql: impl Into<String>, params: Vec<Value>) -> Result<usize> {
        let sql = sql.into();
        self.with_connection(move |conn| {
            conn.execute(&sql, params_from_iter(params))
                .map_err(map_sql_err)
        })
        .await
        .map_err(log_fail("execute", "-"))
    }

    /// Run `f` inside one transaction on one connection: commit when it
    /// returns `Ok`, roll back when it returns `Err`.
    ///
    /// Nested transactions are not supported — do not call manager
    /// operations from inside `f`.
    pub async fn run_in_transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_err)?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit().map_err(map_sql_err)?;
                    Ok(value)
                }
                Err(err) => {
                    // Dropping the transaction rolls it back.
                    warn!(%err, "transaction rolled back");
                    Err(err)
                }
            }
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Maintenance and disposal
    // ─────────────────────────────────────────────────────────────────────

    /// Opportunistic housekeeping for a host backgrounding/pause signal:
    /// reclaim free space, refresh statistics, engine-level optimization.
    /// Advisory — not scheduled on any cadence.
    pub async fn run_maintenance(&self) -> Result<()> {
        debug!("running database maintenance");
        self.with_connection(|conn| {
            conn.execute_batch("VACUUM; ANALYZE; PRAGMA optimize;")
                .map_err(map_sql_err)
        })
        .await
        .map_err(log_fail("maintenance", "-"))
    }

    /// Close the pool. Checked-out connections are not reclaimed — callers
    /// must release before disposal or leak a handle.
    pub fn close(&self) {
        self.pool.close();
        self.started.store(false, Ordering::Release);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
