//! Transaction coordinator.
//!
//! # Responsibility
//! - Open one transaction per unit of work and hand the operation a store
//!   handle bound to it.
//! - Commit on success, roll back on failure, and return the operation's
//!   error unchanged.
//!
//! # Invariants
//! - Writes made through the handle are invisible to other connections
//!   until commit.
//! - A failed commit is reported, never retried here; retry belongs to the
//!   caller.

use crate::db::{open_with_config, StoreConfig};
use crate::repo::entity_store::{EntityStore, RepoError, RepoResult, SqliteEntityStore};
use log::{debug, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Runs units of work atomically against the entity store.
pub trait TransactionCoordinator {
    /// Runs `op` inside one transaction.
    ///
    /// `label` names the unit of work in diagnostics only. Calls must not
    /// nest on the same coordinator.
    ///
    /// # Errors
    /// - Returns `op`'s error unchanged after rolling back.
    /// - Returns a converted `RepoError` when begin or commit fails.
    fn run_transaction<T, E, F>(&self, label: &'static str, op: F) -> Result<T, E>
    where
        F: FnOnce(&dyn EntityStore) -> Result<T, E>,
        E: From<RepoError>;
}

impl<C: TransactionCoordinator> TransactionCoordinator for &C {
    fn run_transaction<T, E, F>(&self, label: &'static str, op: F) -> Result<T, E>
    where
        F: FnOnce(&dyn EntityStore) -> Result<T, E>,
        E: From<RepoError>,
    {
        (**self).run_transaction(label, op)
    }
}

impl<C: TransactionCoordinator> TransactionCoordinator for Arc<C> {
    fn run_transaction<T, E, F>(&self, label: &'static str, op: F) -> Result<T, E>
    where
        F: FnOnce(&dyn EntityStore) -> Result<T, E>,
        E: From<RepoError>,
    {
        (**self).run_transaction(label, op)
    }
}

enum Backend {
    /// Private in-memory database; transactions take turns on one connection.
    Memory(Mutex<Connection>),
    /// File database; each transaction borrows an idle connection or opens one.
    File(Mutex<Vec<Connection>>),
}

/// SQLite implementation of [`TransactionCoordinator`].
pub struct SqliteCoordinator {
    config: StoreConfig,
    backend: Backend,
}

impl SqliteCoordinator {
    /// Opens the configured database and applies migrations.
    pub fn open(config: StoreConfig) -> RepoResult<Self> {
        let conn = open_with_config(&config)?;
        let backend = if config.path.is_some() {
            Backend::File(Mutex::new(vec![conn]))
        } else {
            Backend::Memory(Mutex::new(conn))
        };
        Ok(Self { config, backend })
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::open(StoreConfig::default())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn with_connection<R>(&self, work: impl FnOnce(&mut Connection) -> R) -> RepoResult<R> {
        match &self.backend {
            Backend::Memory(shared) => {
                let mut conn = shared.lock().unwrap_or_else(PoisonError::into_inner);
                Ok(work(&mut conn))
            }
            Backend::File(idle) => {
                let pooled = idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
                let mut conn = match pooled {
                    Some(conn) => conn,
                    None => open_with_config(&self.config)?,
                };
                let result = work(&mut conn);
                idle.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(conn);
                Ok(result)
            }
        }
    }
}

impl TransactionCoordinator for SqliteCoordinator {
    fn run_transaction<T, E, F>(&self, label: &'static str, op: F) -> Result<T, E>
    where
        F: FnOnce(&dyn EntityStore) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.with_connection(|conn| run_in_transaction(conn, label, op))?
    }
}

fn run_in_transaction<T, E, F>(conn: &mut Connection, label: &'static str, op: F) -> Result<T, E>
where
    F: FnOnce(&dyn EntityStore) -> Result<T, E>,
    E: From<RepoError>,
{
    let started_at = Instant::now();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Deferred)
        .map_err(RepoError::from)?;

    let outcome = {
        let store = SqliteEntityStore::new(&tx);
        op(&store)
    };

    match outcome {
        Ok(value) => {
            if let Err(err) = tx.commit() {
                let err = RepoError::from(err);
                warn!(
                    "event=tx_commit module=repo status=error tx={} duration_ms={} conflict={} error={}",
                    label,
                    started_at.elapsed().as_millis(),
                    err.is_conflict(),
                    err
                );
                return Err(err.into());
            }
            debug!(
                "event=tx_commit module=repo status=ok tx={} duration_ms={}",
                label,
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!(
                    "event=tx_rollback module=repo status=error tx={} error={}",
                    label, rollback_err
                );
            }
            info!(
                "event=tx_abort module=repo status=aborted tx={} duration_ms={}",
                label,
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}
