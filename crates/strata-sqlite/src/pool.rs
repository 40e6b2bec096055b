//! Bounded connection pool with an async admission gate.
//!
//! A counting semaphore caps concurrently checked-out connections at the
//! configured maximum; acquisition suspends the caller without blocking the
//! runtime. Checked-out work runs on a blocking task, with the connection
//! moving into the closure and back out — the permit is released on every
//! exit path, so every acquire pairs with exactly one release.
//!
//! Idle connections queue up to the maximum; a connection released when the
//! queue is full is closed instead of retained. A pooled connection that
//! fails its liveness probe on checkout is replaced silently.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use strata_core::{Result, StorageError};

use crate::config::PoolConfig;

/// Checked-out connection counter that decrements on drop, whatever the
/// exit path.
struct CountGuard<'a>(&'a AtomicUsize);

impl<'a> CountGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        let _ = counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for CountGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct PoolShared {
    path: PathBuf,
    config: PoolConfig,
    idle: Mutex<VecDeque<Connection>>,
}

impl PoolShared {
    /// Open a fresh connection with create-if-missing semantics and the
    /// standard pragmas applied.
    fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(StorageError::connection)?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA foreign_keys = ON;\
             PRAGMA synchronous = NORMAL;",
            self.config.busy_timeout_ms
        ))
        .map_err(StorageError::connection)?;
        Ok(conn)
    }

    /// Trivial no-op query validating a pooled connection.
    fn probe(conn: &Connection) -> bool {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    /// Dequeue an idle connection (validated, recreated on a failed probe)
    /// or open one on demand.
    fn checkout(&self) -> Result<Connection> {
        match self.idle.lock().pop_front() {
            Some(conn) if Self::probe(&conn) => Ok(conn),
            Some(stale) => {
                // Replaced silently — staleness is not the caller's problem.
                warn!("stale pooled connection replaced");
                drop(stale);
                self.open_connection()
            }
            None => self.open_connection(),
        }
    }

    /// Return a connection to the idle queue, or close it at capacity.
    fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.config.max_connections as usize {
            idle.push_back(conn);
        }
        // At capacity the connection drops here and closes.
    }

    /// Open the configured minimum of idle connections.
    fn prewarm(&self) -> Result<usize> {
        let mut warmed = 0;
        for _ in 0..self.config.min_connections {
            let conn = self.open_connection()?;
            self.idle.lock().push_back(conn);
            warmed += 1;
        }
        Ok(warmed)
    }
}

/// Bounded multiset of reusable connections to one database file.
pub struct Pool {
    gate: Semaphore,
    shared: Arc<PoolShared>,
    in_use: AtomicUsize,
}

impl Pool {
    /// Create the pool. No connections are opened until
    /// [`prewarm`](Pool::prewarm) or first use.
    pub fn new(path: impl Into<PathBuf>, mut config: PoolConfig) -> Self {
        config.normalize();
        Self {
            gate: Semaphore::new(config.max_connections as usize),
            shared: Arc::new(PoolShared {
                path: path.into(),
                config,
                idle: Mutex::new(VecDeque::new()),
            }),
            in_use: AtomicUsize::new(0),
        }
    }

    /// Pool bounds in effect.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Connections currently checked out (admission slots held).
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    /// Connections currently idle in the queue.
    pub fn idle_count(&self) -> usize {
        self.shared.idle.lock().len()
    }

    /// Pre-open the configured minimum of connections.
    pub async fn prewarm(&self) -> Result<usize> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.prewarm())
            .await
            .map_err(|err| StorageError::Internal(format!("prewarm task failed: {err}")))?
    }

    /// Run `f` with exclusive access to a pooled connection.
    ///
    /// Suspends on the admission gate while the pool is at its maximum, then
    /// executes `f` on a blocking task so the caller's context never blocks
    /// on disk I/O. The admission slot is released on success, failure, and
    /// panic alike.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| StorageError::connection("pool is closed"))?;
        let _count = CountGuard::new(&self.in_use);

        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || {
            let mut conn = shared.checkout()?;
            let out = f(&mut conn);
            shared.release(conn);
            out
        })
        .await
        .map_err(|err| StorageError::Internal(format!("database task failed: {err}")))?
    }

    /// Close the pool: new acquisitions fail, the idle queue drains and
    /// every idle connection closes. Checked-out connections are not
    /// reclaimed — callers must finish before disposal or leak a handle.
    pub fn close(&self) {
        self.gate.close();
        let drained: Vec<Connection> = self.shared.idle.lock().drain(..).collect();
        debug!(closed = drained.len(), "connection pool closed");
        drop(drained);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn test_pool(dir: &tempfile::TempDir, min: u32, max: u32) -> Pool {
        Pool::new(
            dir.path().join("pool.db"),
            PoolConfig {
                min_connections: min,
                max_connections: max,
                busy_timeout_ms: 5000,
            },
        )
    }

    #[tokio::test]
    async fn prewarm_opens_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir, 3, 8);
        assert_eq!(pool.prewarm().await.unwrap(), 3);
        assert_eq!(pool.idle_count(), 3);
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test]
    async fn connection_is_reused_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir, 1, 4);
        let _ = pool.prewarm().await.unwrap();

        let one: i64 = pool
            .with_connection(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get(0))
                    .map_err(StorageError::database)
            })
            .await
            .unwrap();
        assert_eq!(one, 1);
        // Back in the queue, not closed.
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test]
    async fn operation_error_still_releases_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir, 0, 2);

        let err = pool
            .with_connection::<_, ()>(|conn| {
                let _ = conn
                    .execute("SELECT * FROM no_such_table", [])
                    .map_err(StorageError::database)?;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
        assert_eq!(pool.in_use(), 0);

        // The pool still works afterwards.
        let two: i64 = pool
            .with_connection(|conn| {
                conn.query_row("SELECT 2", [], |row| row.get(0))
                    .map_err(StorageError::database)
            })
            .await
            .unwrap();
        assert_eq!(two, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn checked_out_never_exceeds_maximum() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(test_pool(&dir, 0, 2));

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    pool.with_connection(|_conn| {
                        std::thread::sleep(Duration::from_millis(100));
                        Ok(())
                    })
                    .await
                    .unwrap();
                })
            })
            .collect();

        // Sample the checked-out count while the three operations contend
        // for two slots.
        let mut peak = 0;
        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(250) {
            peak = peak.max(pool.in_use());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak <= 2, "checked-out count reached {peak}");
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn third_acquisition_waits_for_a_release() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(test_pool(&dir, 0, 2));

        let started = Instant::now();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    pool.with_connection(|_conn| {
                        std::thread::sleep(Duration::from_millis(100));
                        Ok(())
                    })
                    .await
                    .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // Two run in parallel, the third waits for a slot: two full rounds.
        assert!(
            started.elapsed() >= Duration::from_millis(190),
            "three operations finished too quickly for a two-slot pool"
        );
    }

    #[tokio::test]
    async fn release_above_capacity_discards() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir, 0, 2);

        // Fill the idle queue to capacity by hand.
        for _ in 0..3 {
            let conn = pool.shared.open_connection().unwrap();
            pool.shared.release(conn);
        }
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn closed_pool_rejects_acquisition() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir, 2, 4);
        let _ = pool.prewarm().await.unwrap();

        pool.close();
        assert_eq!(pool.idle_count(), 0);

        let err = pool
            .with_connection::<_, ()>(|_conn| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
