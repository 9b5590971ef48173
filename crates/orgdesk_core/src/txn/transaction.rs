//! One unit of work: buffered writes, held row locks and flush state.

use super::lock::{LockGrant, LockWaitTimeout};
use super::manager::{FlushedRow, RowImage, Shared};
use super::{IsolationLevel, TxnError, TxnId, TxnResult};
use crate::model::department::{validate_department_name, Department, DepartmentId};
use crate::repo::department_repo::{DepartmentRepository, SqliteDepartmentRepository};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Committed,
    RolledBack,
}

/// Handle for an open unit of work.
///
/// Writes are buffered per row (last write wins) and reach the store only
/// on `commit`. `flush` moves buffered writes into the shared overlay where
/// this transaction and read-uncommitted readers can see them.
///
/// Dropping an unfinished transaction rolls it back, so early returns via
/// `?` and panics never leave locks or flushed rows behind.
pub struct Transaction {
    id: TxnId,
    shared: Arc<Shared>,
    pending: BTreeMap<DepartmentId, RowImage>,
    flushed: BTreeMap<DepartmentId, RowImage>,
    held_locks: BTreeSet<DepartmentId>,
    started_at: Instant,
    finished: bool,
}

impl Transaction {
    pub(crate) fn new(id: TxnId, shared: Arc<Shared>) -> Self {
        debug!("event=txn_begin module=txn status=ok txn={id}");
        Self {
            id,
            shared,
            pending: BTreeMap::new(),
            flushed: BTreeMap::new(),
            held_locks: BTreeSet::new(),
            started_at: Instant::now(),
            finished: false,
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn holds_lock(&self, id: DepartmentId) -> bool {
        self.held_locks.contains(&id)
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Unlocked point read.
    ///
    /// Own flushed writes always win. Under `ReadUncommitted` another
    /// transaction's flushed image is returned before the committed row.
    pub fn read(&self, id: DepartmentId, isolation: IsolationLevel) -> TxnResult<Department> {
        if let Some(image) = self.flushed.get(&id) {
            return image_or_not_found(id, image);
        }
        if isolation == IsolationLevel::ReadUncommitted {
            let overlay = self.shared.flushed.lock();
            if let Some(row) = overlay.get(&id) {
                debug!(
                    "event=dirty_read module=txn status=ok txn={} row={id} writer={}",
                    self.id, row.owner
                );
                return image_or_not_found(id, &row.image);
            }
        }
        self.read_committed(id)
    }

    /// Takes the exclusive lock on `id` and returns the row as this
    /// transaction sees it (own flushed image, else committed).
    ///
    /// Blocks while another transaction holds the lock, up to the manager's
    /// lock timeout. A lock taken for a missing row is released again.
    pub fn lock_for_update(&mut self, id: DepartmentId) -> TxnResult<Department> {
        let grant = self.acquire_row_lock(id)?;
        let current = match self.flushed.get(&id) {
            Some(image) => image_or_not_found(id, image),
            None => self.read_committed(id),
        };
        if current.is_err() && grant == LockGrant::Acquired {
            self.held_locks.remove(&id);
            self.shared.locks.release_all(self.id, [id]);
        }
        current
    }

    /// Buffers a full-row replacement. Takes the row lock if not yet held.
    pub fn update(&mut self, department: &Department) -> TxnResult<()> {
        validate_department_name(&department.department_name)?;
        self.acquire_row_lock(department.id)?;
        self.ensure_row_exists(department.id)?;
        self.pending
            .insert(department.id, RowImage::Present(department.clone()));
        Ok(())
    }

    /// Buffers a physical delete. Takes the row lock if not yet held.
    pub fn delete(&mut self, id: DepartmentId) -> TxnResult<()> {
        self.acquire_row_lock(id)?;
        self.ensure_row_exists(id)?;
        self.pending.insert(id, RowImage::Deleted);
        Ok(())
    }

    /// Publishes buffered writes to the overlay without committing.
    ///
    /// Locks stay held. Committed readers keep seeing the old values.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let rows = self.pending.len();
        let mut overlay = self.shared.flushed.lock();
        for (id, image) in std::mem::take(&mut self.pending) {
            overlay.insert(
                id,
                FlushedRow {
                    owner: self.id,
                    image: image.clone(),
                },
            );
            self.flushed.insert(id, image);
        }
        debug!(
            "event=txn_flush module=txn status=ok txn={} rows={rows}",
            self.id
        );
    }

    /// Applies every buffered and flushed write in one store transaction,
    /// then releases all locks.
    ///
    /// On failure nothing is applied and the transaction is rolled back.
    pub fn commit(mut self) -> TxnResult<()> {
        match self.apply_writes() {
            Ok(rows) => {
                self.finish(Outcome::Committed);
                info!(
                    "event=txn_commit module=txn status=ok txn={} rows={rows} duration_ms={}",
                    self.id,
                    self.started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=txn_commit module=txn status=error txn={} error={err}",
                    self.id
                );
                self.finish(Outcome::RolledBack);
                Err(err)
            }
        }
    }

    /// Discards all writes and releases all locks.
    pub fn rollback(mut self) {
        self.finish(Outcome::RolledBack);
        info!(
            "event=txn_rollback module=txn status=ok txn={} reason=explicit duration_ms={}",
            self.id,
            self.started_at.elapsed().as_millis()
        );
    }

    fn apply_writes(&mut self) -> TxnResult<usize> {
        let mut writes = std::mem::take(&mut self.flushed);
        writes.append(&mut self.pending);
        if writes.is_empty() {
            return Ok(0);
        }

        let mut conn = self.shared.store.lock();
        let store_tx = conn.transaction()?;
        {
            let repo = SqliteDepartmentRepository::new(&store_tx);
            for (id, image) in &writes {
                match image {
                    RowImage::Present(department) => {
                        repo.update(*id, &department.department_name)?
                    }
                    RowImage::Deleted => repo.delete(*id)?,
                }
            }
        }
        store_tx.commit()?;
        Ok(writes.len())
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.pending.clear();
        self.flushed.clear();

        // Clear the overlay before unlocking: the next holder must not find our images.
        self.shared
            .flushed
            .lock()
            .retain(|_, row| row.owner != self.id);
        let held = std::mem::take(&mut self.held_locks);
        self.shared.locks.release_all(self.id, held);

        let counter = match outcome {
            Outcome::Committed => &self.shared.committed,
            Outcome::RolledBack => &self.shared.rolled_back,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn acquire_row_lock(&mut self, id: DepartmentId) -> TxnResult<LockGrant> {
        let grant = self
            .shared
            .locks
            .acquire(id, self.id, self.shared.lock_timeout)
            .map_err(|LockWaitTimeout { holder, waited }| TxnError::LockTimeout {
                id,
                holder,
                waited_ms: waited.as_millis(),
            })?;
        self.held_locks.insert(id);
        Ok(grant)
    }

    fn ensure_row_exists(&self, id: DepartmentId) -> TxnResult<()> {
        let own = self.pending.get(&id).or_else(|| self.flushed.get(&id));
        match own {
            Some(image) => image_or_not_found(id, image).map(|_| ()),
            None => self.read_committed(id).map(|_| ()),
        }
    }

    fn read_committed(&self, id: DepartmentId) -> TxnResult<Department> {
        let conn = self.shared.store.lock();
        SqliteDepartmentRepository::new(&conn)
            .get(id)?
            .ok_or(TxnError::RowNotFound(id))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let reason = if std::thread::panicking() {
            "panic"
        } else {
            "dropped"
        };
        self.finish(Outcome::RolledBack);
        info!(
            "event=txn_rollback module=txn status=ok txn={} reason={reason} duration_ms={}",
            self.id,
            self.started_at.elapsed().as_millis()
        );
    }
}

fn image_or_not_found(id: DepartmentId, image: &RowImage) -> TxnResult<Department> {
    match image {
        RowImage::Present(department) => Ok(department.clone()),
        RowImage::Deleted => Err(TxnError::RowNotFound(id)),
    }
}
