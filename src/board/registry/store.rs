//! `Registry` handle and its operations.

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::types::{
    ExpiryTimer, RegistrySnapshot, RegistryState, ServiceStatus, validate_service_name,
    validate_value,
};
use crate::constants::MAX_EXPIRY;
use crate::error::{Error, Result};
use crate::telemetry;

/// Shared service registry.
///
/// # Thread Safety
///
/// `Registry` is `Clone` and every clone refers to the same state. Expiry
/// timers hold only a weak reference; dropping the last clone drops every
/// record and with it every pending timer.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<RegistryState>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or updates a service.
    ///
    /// A new name is appended to the rotation order; an existing one keeps
    /// its position. Any pending expiry is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the name or value is malformed. Nothing is
    /// changed in that case.
    pub fn upsert(&self, name: &str, value: &str) -> Result<()> {
        validate_service_name(name)?;
        validate_value(value)?;

        let (created, count) = {
            let mut state = self.inner.lock();
            let created = state.upsert(name, value, Utc::now());
            (created, state.len())
        };

        telemetry::record_registry_operation("upsert");
        if created {
            telemetry::set_service_count(count);
            tracing::info!(service = %name, "Service registered");
        } else {
            tracing::debug!(service = %name, "Service updated");
        }
        Ok(())
    }

    /// Creates or updates a service and replaces its expiry in one step.
    ///
    /// This is what a status update does: the value is written and the
    /// previous timer is cancelled under the same lock, so an old timer can
    /// never remove the value written here. `None` leaves no expiry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the name or value is malformed. Nothing is
    /// changed in that case.
    ///
    /// # Panics
    ///
    /// Scheduling an expiry spawns a task and so must happen inside a Tokio
    /// runtime.
    pub fn put(&self, name: &str, value: &str, expiry: Option<Duration>) -> Result<()> {
        validate_service_name(name)?;
        validate_value(value)?;

        let (created, count) = {
            let mut state = self.inner.lock();
            let created = state.upsert(name, value, Utc::now());
            self.replace_timer(&mut state, name, expiry);
            (created, state.len())
        };

        telemetry::record_registry_operation("put");
        if created {
            telemetry::set_service_count(count);
            tracing::info!(service = %name, "Service registered");
        }
        tracing::debug!(service = %name, expiry_ms = ?expiry.map(|d| d.as_millis()), "Service updated");
        Ok(())
    }

    /// Replaces the expiry of a service.
    ///
    /// `Some(duration)` schedules removal after `duration` (capped at one
    /// year); `None` clears any pending expiry. Returns false if the
    /// service does not exist.
    ///
    /// # Panics
    ///
    /// Scheduling an expiry spawns a task and so must happen inside a Tokio
    /// runtime.
    pub fn set_expiry(&self, name: &str, expiry: Option<Duration>) -> bool {
        {
            let mut state = self.inner.lock();
            if !state.contains(name) {
                return false;
            }
            self.replace_timer(&mut state, name, expiry);
        }

        telemetry::record_registry_operation("set_expiry");
        tracing::debug!(service = %name, expiry_ms = ?expiry.map(|d| d.as_millis()), "Expiry set");
        true
    }

    /// Installs a new timer for `name`, or none. Must be called with the
    /// lock held; the previous timer is dropped, which aborts it.
    fn replace_timer(&self, state: &mut RegistryState, name: &str, expiry: Option<Duration>) {
        let timer = expiry.map(|duration| {
            let duration = duration.min(MAX_EXPIRY);
            let id = state.allocate_timer_id();
            let task = tokio::spawn(expire_after(
                Arc::downgrade(&self.inner),
                name.to_string(),
                id,
                duration,
            ));
            let expire_at = TimeDelta::from_std(duration)
                .ok()
                .and_then(|delta| Utc::now().checked_add_signed(delta));
            (ExpiryTimer::new(id, task.abort_handle()), expire_at)
        });

        if let Some(record) = state.record_mut(name) {
            match timer {
                Some((timer, expire_at)) => {
                    record.timer = Some(timer);
                    record.expire_at = expire_at;
                },
                None => {
                    record.timer = None;
                    record.expire_at = None;
                },
            }
        }
    }

    /// Removes a service. Returns whether it existed.
    pub fn delete(&self, name: &str) -> bool {
        let (removed, count) = {
            let mut state = self.inner.lock();
            let removed = state.remove(name);
            (removed, state.len())
        };

        let existed = removed.is_some();
        if existed {
            telemetry::record_registry_operation("delete");
            telemetry::set_service_count(count);
            tracing::info!(service = %name, "Service removed");
        }
        existed
    }

    /// Removes `name` on behalf of timer `timer_id`, unless the record has
    /// been given a different timer (or none) since the timer was armed.
    pub(super) fn expire(&self, name: &str, timer_id: u64) -> bool {
        let (removed, count) = {
            let mut state = self.inner.lock();
            if state.timer_id(name) != Some(timer_id) {
                return false;
            }
            let removed = state.remove(name);
            (removed, state.len())
        };

        if let Some(record) = removed {
            // The record owns the handle of the task running this call.
            // Aborting the current task only takes effect at its next await.
            drop(record);
            telemetry::record_expiration();
            telemetry::set_service_count(count);
            tracing::info!(service = %name, "Service expired");
            return true;
        }
        false
    }

    /// Current state of one service.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such service exists.
    pub fn get(&self, name: &str) -> Result<ServiceStatus> {
        self.inner
            .lock()
            .status(name)
            .ok_or_else(|| Error::not_found(name))
    }

    /// Names in rotation order and the cursor.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.inner.lock().snapshot()
    }

    /// Moves the rotation cursor forward and returns the service now under
    /// it, or `None` when the registry is empty.
    pub fn advance(&self) -> Option<ServiceStatus> {
        self.inner.lock().advance()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(super) fn assert_invariants(&self) {
        self.inner.lock().assert_invariants();
    }
}

async fn expire_after(
    registry: Weak<Mutex<RegistryState>>,
    name: String,
    timer_id: u64,
    after: Duration,
) {
    tokio::time::sleep(after).await;
    if let Some(inner) = registry.upgrade() {
        Registry { inner }.expire(&name, timer_id);
    }
}
