//! Operations that deliberately expose isolation anomalies.
//!
//! # Responsibility
//! - Compose the department service and raw transactions into sequences
//!   whose timing external tooling can probe.
//!
//! # Invariants
//! - The hold window sleeps with the row lock held and the write flushed,
//!   so lock-based callers block for the whole window.
//! - The dirty-read isolation level is fixed at construction, never implied.
//! - Nothing here retries.

use crate::config::CoreConfig;
use crate::model::department::{Department, DepartmentId, DepartmentPatch};
use crate::service::department_service::{DepartmentService, ServiceResult};
use crate::txn::{IsolationLevel, Transaction};
use log::info;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSettings {
    /// How long the delayed operations keep their transaction open.
    pub hold: Duration,
    pub dirty_read_isolation: IsolationLevel,
}

impl DemoSettings {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            hold: config.demo_delay(),
            dirty_read_isolation: config.dirty_read_isolation,
        }
    }
}

#[derive(Clone)]
pub struct ConcurrencyDemo {
    service: DepartmentService,
    settings: DemoSettings,
}

impl ConcurrencyDemo {
    pub fn new(service: DepartmentService, settings: DemoSettings) -> Self {
        Self { service, settings }
    }

    pub fn settings(&self) -> DemoSettings {
        self.settings
    }

    pub fn service(&self) -> &DepartmentService {
        &self.service
    }

    /// Two unlocked updates back-to-back. The stored value ends as `second`;
    /// a reader between the calls may see `first`.
    pub fn sequential_double_update(
        &self,
        id: DepartmentId,
        first: &DepartmentPatch,
        second: &DepartmentPatch,
    ) -> ServiceResult<Department> {
        self.service.update_department(id, first)?;
        self.service.update_department(id, second)
    }

    /// Lock, mutate, commit. Concurrent callers on the same id serialize.
    pub fn locked_update(
        &self,
        id: DepartmentId,
        patch: &DepartmentPatch,
    ) -> ServiceResult<Department> {
        self.service.update_department_locked(id, patch)
    }

    /// Unlocked read at the configured dirty-read isolation level.
    pub fn dirty_read(&self, id: DepartmentId) -> ServiceResult<Department> {
        let isolation = self.settings.dirty_read_isolation;
        self.service
            .manager()
            .run(|tx| -> ServiceResult<Department> { Ok(tx.read(id, isolation)?) })
    }

    /// Lock, mutate, flush, hold for the configured window, commit.
    ///
    /// While held, lock-based access to `id` blocks and a read-uncommitted
    /// read observes the flushed value.
    pub fn dirty_update_window(
        &self,
        id: DepartmentId,
        patch: &DepartmentPatch,
    ) -> ServiceResult<Department> {
        patch.validate()?;
        self.service
            .manager()
            .run(|tx| -> ServiceResult<Department> {
                let next = tx.lock_for_update(id)?.apply(patch)?;
                tx.update(&next)?;
                tx.flush();
                self.hold(tx, id, "dirty_update");
                Ok(next)
            })
    }

    /// One locked transaction applying `first`, holding, then `second`.
    ///
    /// Overlapping callers serialize on the row lock; the stored value is
    /// the `second` of whichever caller commits last.
    pub fn locked_double_update_with_delay(
        &self,
        id: DepartmentId,
        first: &DepartmentPatch,
        second: &DepartmentPatch,
    ) -> ServiceResult<Department> {
        first.validate()?;
        second.validate()?;
        self.service
            .manager()
            .run(|tx| -> ServiceResult<Department> {
                let intermediate = tx.lock_for_update(id)?.apply(first)?;
                tx.update(&intermediate)?;
                tx.flush();
                self.hold(tx, id, "concurrent_update");

                let next = tx.lock_for_update(id)?.apply(second)?;
                tx.update(&next)?;
                Ok(next)
            })
    }

    fn hold(&self, tx: &Transaction, id: DepartmentId, operation: &str) {
        let started_at = Instant::now();
        info!(
            "event=demo_hold module=demo status=start op={operation} txn={} row={id} hold_ms={}",
            tx.id(),
            self.settings.hold.as_millis()
        );
        std::thread::sleep(self.settings.hold);
        info!(
            "event=demo_hold module=demo status=ok op={operation} txn={} row={id} duration_ms={}",
            tx.id(),
            started_at.elapsed().as_millis()
        );
    }
}
