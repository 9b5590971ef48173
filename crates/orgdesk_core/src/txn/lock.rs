//! Exclusive per-row lock table with bounded waits.

use super::TxnId;
use crate::model::department::DepartmentId;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockGrant {
    /// The caller did not hold the lock before this call.
    Acquired,
    AlreadyHeld,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LockWaitTimeout {
    pub holder: TxnId,
    pub waited: Duration,
}

/// Row id -> owning transaction. Waiters park on `released`.
#[derive(Default)]
pub(crate) struct RowLockTable {
    owners: Mutex<HashMap<DepartmentId, TxnId>>,
    released: Condvar,
}

impl RowLockTable {
    /// Blocks until `txn` owns the lock on `id` or `timeout` elapses.
    ///
    /// Re-entrant: a transaction asking again for a lock it holds returns
    /// immediately with `LockGrant::AlreadyHeld`.
    pub(crate) fn acquire(
        &self,
        id: DepartmentId,
        txn: TxnId,
        timeout: Duration,
    ) -> Result<LockGrant, LockWaitTimeout> {
        let started_at = Instant::now();
        let deadline = started_at + timeout;
        let mut owners = self.owners.lock();
        let mut logged_wait = false;

        loop {
            match owners.get(&id).copied() {
                None => {
                    owners.insert(id, txn);
                    if logged_wait {
                        debug!(
                            "event=row_lock_wait module=txn status=ok txn={txn} row={id} waited_ms={}",
                            started_at.elapsed().as_millis()
                        );
                    }
                    return Ok(LockGrant::Acquired);
                }
                Some(owner) if owner == txn => return Ok(LockGrant::AlreadyHeld),
                Some(holder) => {
                    if Instant::now() >= deadline {
                        let waited = started_at.elapsed();
                        warn!(
                            "event=row_lock_timeout module=txn status=error txn={txn} row={id} holder={holder} waited_ms={}",
                            waited.as_millis()
                        );
                        return Err(LockWaitTimeout { holder, waited });
                    }
                    if !logged_wait {
                        debug!(
                            "event=row_lock_wait module=txn status=start txn={txn} row={id} holder={holder}"
                        );
                        logged_wait = true;
                    }
                    self.released.wait_until(&mut owners, deadline);
                }
            }
        }
    }

    /// Releases the given rows if `txn` owns them and wakes all waiters.
    pub(crate) fn release_all(&self, txn: TxnId, ids: impl IntoIterator<Item = DepartmentId>) {
        let mut owners = self.owners.lock();
        let mut released_any = false;
        for id in ids {
            if owners.get(&id) == Some(&txn) {
                owners.remove(&id);
                released_any = true;
            }
        }
        drop(owners);
        if released_any {
            self.released.notify_all();
        }
    }

    pub(crate) fn holder_of(&self, id: DepartmentId) -> Option<TxnId> {
        self.owners.lock().get(&id).copied()
    }

    pub(crate) fn held_count(&self) -> usize {
        self.owners.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::{LockGrant, RowLockTable};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn lock_is_reentrant_for_owner() {
        let table = RowLockTable::default();
        let timeout = Duration::from_millis(50);

        assert_eq!(table.acquire(1, 10, timeout), Ok(LockGrant::Acquired));
        assert_eq!(table.acquire(1, 10, timeout), Ok(LockGrant::AlreadyHeld));
        assert_eq!(table.holder_of(1), Some(10));
    }

    #[test]
    fn contended_lock_times_out_with_holder() {
        let table = RowLockTable::default();
        table.acquire(1, 10, Duration::from_millis(10)).unwrap();

        let err = table.acquire(1, 11, Duration::from_millis(60)).unwrap_err();
        assert_eq!(err.holder, 10);
        assert!(err.waited >= Duration::from_millis(60));
    }

    #[test]
    fn release_wakes_waiter() {
        let table = Arc::new(RowLockTable::default());
        table.acquire(5, 1, Duration::from_millis(10)).unwrap();

        let waiter_table = Arc::clone(&table);
        let waiter = thread::spawn(move || {
            let started = Instant::now();
            let grant = waiter_table.acquire(5, 2, Duration::from_secs(5));
            (grant, started.elapsed())
        });

        thread::sleep(Duration::from_millis(100));
        table.release_all(1, [5]);

        let (grant, waited) = waiter.join().unwrap();
        assert_eq!(grant, Ok(LockGrant::Acquired));
        assert!(waited >= Duration::from_millis(80));
        assert_eq!(table.holder_of(5), Some(2));
    }

    #[test]
    fn release_ignores_rows_owned_by_others() {
        let table = RowLockTable::default();
        table.acquire(1, 10, Duration::from_millis(10)).unwrap();

        table.release_all(99, [1]);
        assert_eq!(table.holder_of(1), Some(10));
        assert_eq!(table.held_count(), 1);
    }
}
