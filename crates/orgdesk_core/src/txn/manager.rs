//! Shared transaction state and unit-of-work entry points.

use super::lock::RowLockTable;
use super::transaction::Transaction;
use super::{TxnError, TxnId, TxnResult};
use crate::config::CoreConfig;
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::department::{validate_department_name, Department, DepartmentId};
use crate::repo::department_repo::{DepartmentRepository, SqliteDepartmentRepository};
use log::info;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-flight image of a row inside one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RowImage {
    Present(Department),
    Deleted,
}

/// Flushed-but-uncommitted image and the transaction that produced it.
#[derive(Debug, Clone)]
pub(crate) struct FlushedRow {
    pub owner: TxnId,
    pub image: RowImage,
}

pub(crate) struct Shared {
    /// Committed state. Held only for the duration of one store call.
    pub store: Mutex<Connection>,
    pub locks: RowLockTable,
    /// Rows flushed by a live transaction, keyed by row id.
    pub flushed: Mutex<HashMap<DepartmentId, FlushedRow>>,
    pub lock_timeout: Duration,
    next_txn_id: AtomicU64,
    begun: AtomicU64,
    pub committed: AtomicU64,
    pub rolled_back: AtomicU64,
}

impl Shared {
    fn next_txn_id(&self) -> TxnId {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }
}

/// Counters for monitoring and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub locked_rows: usize,
    pub flushed_rows: usize,
}

impl TxnStats {
    pub fn active(&self) -> u64 {
        self.begun
            .saturating_sub(self.committed)
            .saturating_sub(self.rolled_back)
    }
}

/// Entry point for units of work over the department store.
///
/// Cheap to clone; clones share the store, lock table and flushed overlay,
/// so one manager can be handed to every worker thread.
#[derive(Clone)]
pub struct TxnManager {
    shared: Arc<Shared>,
}

impl TxnManager {
    /// Wraps a migrated connection.
    pub fn new(conn: Connection, lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(conn),
                locks: RowLockTable::default(),
                flushed: Mutex::new(HashMap::new()),
                lock_timeout,
                next_txn_id: AtomicU64::new(1),
                begun: AtomicU64::new(0),
                committed: AtomicU64::new(0),
                rolled_back: AtomicU64::new(0),
            }),
        }
    }

    /// Opens the configured store (file or in-memory) and wraps it.
    pub fn open(config: &CoreConfig) -> DbResult<Self> {
        let conn = match &config.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        Ok(Self::new(conn, config.lock_timeout()))
    }

    pub fn lock_timeout(&self) -> Duration {
        self.shared.lock_timeout
    }

    /// Opens a unit of work. Dropping it without `commit` rolls it back.
    pub fn begin(&self) -> Transaction {
        let id = self.shared.next_txn_id();
        self.shared.begun.fetch_add(1, Ordering::Relaxed);
        Transaction::new(id, Arc::clone(&self.shared))
    }

    /// Runs `work` in a fresh transaction: commit on `Ok`, rollback on `Err`.
    pub fn run<T, E>(&self, work: impl FnOnce(&mut Transaction) -> Result<T, E>) -> Result<T, E>
    where
        E: From<TxnError>,
    {
        let mut tx = self.begin();
        match work(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Inserts a department in its own short store transaction.
    ///
    /// Ids are store-assigned, so there is no row to lock beforehand.
    pub fn insert(&self, department_name: &str) -> TxnResult<Department> {
        validate_department_name(department_name)?;
        let conn = self.shared.store.lock();
        let department = SqliteDepartmentRepository::new(&conn).insert(department_name)?;
        info!(
            "event=department_insert module=txn status=ok row={}",
            department.id
        );
        Ok(department)
    }

    /// Committed rows only, ordered by id.
    pub fn list_committed(&self) -> TxnResult<Vec<Department>> {
        let conn = self.shared.store.lock();
        Ok(SqliteDepartmentRepository::new(&conn).list()?)
    }

    /// Runs `f` against the store connection, e.g. for collaborator tables.
    pub fn with_store<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.shared.store.lock();
        f(&conn)
    }

    /// Transaction currently holding the lock on `id`, if any.
    pub fn lock_holder(&self, id: DepartmentId) -> Option<TxnId> {
        self.shared.locks.holder_of(id)
    }

    pub fn stats(&self) -> TxnStats {
        TxnStats {
            begun: self.shared.begun.load(Ordering::Relaxed),
            committed: self.shared.committed.load(Ordering::Relaxed),
            rolled_back: self.shared.rolled_back.load(Ordering::Relaxed),
            locked_rows: self.shared.locks.held_count(),
            flushed_rows: self.shared.flushed.lock().len(),
        }
    }
}
