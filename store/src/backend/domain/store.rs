//! The store handle and its single-writer execution model.
//!
//! Every mutation goes through [`ClubStore::run_write`]: it waits for the write
//! gate, then runs validate → write → cascade → recompute inside one SQLite
//! transaction on a spawned task, commits, and notifies live queries before
//! the gate is released. Reads go straight to the pool and only ever see
//! committed state.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use super::error::{StoreError, StoreResult};
use super::live_query::{ChangeSet, LiveQueries, QueryShape, Subscription, Table};
use crate::backend::config::StoreConfig;
use crate::backend::storage::DbConnection;

/// Handle to an open club directory store. Cheap to clone.
#[derive(Clone)]
pub struct ClubStore {
    inner: Arc<Inner>,
}

struct Inner {
    db: DbConnection,
    write_gate: Arc<Mutex<()>>,
    live: Arc<LiveQueries>,
}

/// One serialized mutation in progress.
///
/// Owns the open transaction, the tables touched so far and the write gate.
/// Dropping it without going through `run_write` rolls everything back.
pub struct WriteUnit {
    tx: Transaction<'static, Sqlite>,
    changes: ChangeSet,
    _gate: OwnedMutexGuard<()>,
}

impl WriteUnit {
    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Record that `table` was modified, for live query notification
    pub(crate) fn touch(&mut self, table: Table) {
        self.changes.insert(table);
    }
}

impl ClubStore {
    /// Open the database described by `config`, creating it if needed
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        info!("Opening club directory store at {}", config.database_url);
        let db = DbConnection::new(config).await?;
        Ok(Self::with_connection(db))
    }

    pub fn with_connection(db: DbConnection) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                write_gate: Arc::new(Mutex::new(())),
                live: Arc::new(LiveQueries::default()),
            }),
        }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        self.inner.db.pool()
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.inner.db.pool().close().await;
    }

    /// Run `body` as one atomic, serialized mutation.
    ///
    /// Cancelling the returned future while it waits for the gate abandons the
    /// call. Once the gate is held the body runs on its own task and always
    /// finishes (commit or rollback) regardless of the caller.
    pub(crate) async fn run_write<T, F, Fut>(&self, operation: &'static str, body: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(WriteUnit) -> Fut + Send + 'static,
        Fut: Future<Output = StoreResult<(T, WriteUnit)>> + Send + 'static,
    {
        let gate = Arc::clone(&self.inner.write_gate).lock_owned().await;
        debug!("Write gate acquired for {}", operation);

        let store = self.clone();
        let task = tokio::spawn(async move {
            let tx = store.pool().begin().await?;
            let unit = WriteUnit {
                tx,
                changes: ChangeSet::default(),
                _gate: gate,
            };

            let (value, unit) = body(unit).await?;

            let WriteUnit { tx, changes, _gate } = unit;
            tx.commit().await?;
            store.inner.live.publish(store.pool(), &changes).await;

            Ok::<_, StoreError>(value)
        });

        match task.await {
            Ok(result) => {
                if let Err(e) = &result {
                    debug!("Write {} rolled back: {}", operation, e);
                }
                result
            }
            Err(join_error) => {
                error!("Write {} did not complete: {}", operation, join_error);
                Err(StoreError::Aborted(operation))
            }
        }
    }

    /// Subscribe to a query; the first snapshot is the current result.
    ///
    /// Registration happens under the write gate so no commit can slip
    /// between the initial snapshot and the first notification.
    pub async fn subscribe(&self, shape: QueryShape) -> StoreResult<Subscription> {
        let _gate = self.inner.write_gate.lock().await;

        let snapshot = shape.evaluate(self.pool()).await?;
        let subscription = self.inner.live.register(shape, snapshot);

        debug!("Registered live query {}", subscription.id());
        Ok(subscription)
    }

    /// Number of live subscriptions still registered
    pub fn subscription_count(&self) -> usize {
        self.inner.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::MetaRepository;
    use crate::backend::test_utils::TestEnvironment;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failed_body_rolls_back() {
        let env = TestEnvironment::new().await;

        let result: StoreResult<()> = env
            .store
            .run_write("test_rollback", |mut unit| async move {
                MetaRepository::put(unit.conn(), "marker", "written").await?;
                Err::<((), WriteUnit), _>(StoreError::validation("marker", "rejected after write"))
            })
            .await;

        assert!(matches!(result, Err(StoreError::Validation { .. })));
        let marker = MetaRepository::get(env.store.pool(), "marker").await.unwrap();
        assert_eq!(marker, None);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_abort_commit() {
        let env = TestEnvironment::new().await;
        let store = env.store.clone();

        let write = store.run_write("test_slow_write", |mut unit| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            MetaRepository::put(unit.conn(), "marker", "committed").await?;
            Ok::<_, StoreError>(((), unit))
        });

        // Gives up after the gate was taken but before the body finishes
        let outcome = tokio::time::timeout(Duration::from_millis(10), write).await;
        assert!(outcome.is_err());

        // The next writer waits for the abandoned one to commit
        env.store
            .run_write("test_barrier", |unit| async move { Ok::<_, StoreError>(((), unit)) })
            .await
            .unwrap();

        let marker = MetaRepository::get(env.store.pool(), "marker").await.unwrap();
        assert_eq!(marker.as_deref(), Some("committed"));
    }

    #[tokio::test]
    async fn test_panicking_body_reports_aborted() {
        let env = TestEnvironment::new().await;

        let result: StoreResult<()> = env
            .store
            .run_write("test_panic", |unit| async move {
                if unit.changes.is_empty() {
                    panic!("boom");
                }
                Ok::<_, StoreError>(((), unit))
            })
            .await;

        assert!(matches!(result, Err(StoreError::Aborted("test_panic"))));

        // The gate is released with the panicking task
        env.store
            .run_write("test_after_panic", |unit| async move { Ok::<_, StoreError>(((), unit)) })
            .await
            .unwrap();
    }
}
