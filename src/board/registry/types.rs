//! Registry state and the types it hands out.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::task::AbortHandle;

use crate::constants::{MAX_NAME_LEN, MAX_VALUE_CHARS};
use crate::error::{Error, Result};

/// Public view of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub name: String,
    pub value: String,
    pub last_update: DateTime<Utc>,
    pub expire_at: Option<DateTime<Utc>>,
}

/// Names in rotation order plus the current cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub services: Vec<String>,
    pub cursor: Option<usize>,
}

/// Handle to a pending expiry. Dropping it cancels the timer task.
#[derive(Debug)]
pub(super) struct ExpiryTimer {
    pub(super) id: u64,
    handle: AbortHandle,
}

impl ExpiryTimer {
    pub(super) const fn new(id: u64, handle: AbortHandle) -> Self {
        Self { id, handle }
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
pub(super) struct ServiceRecord {
    pub(super) value: String,
    pub(super) last_update: DateTime<Utc>,
    pub(super) expire_at: Option<DateTime<Utc>>,
    pub(super) timer: Option<ExpiryTimer>,
}

impl ServiceRecord {
    fn status(&self, name: &str) -> ServiceStatus {
        ServiceStatus {
            name: name.to_string(),
            value: self.value.clone(),
            last_update: self.last_update,
            expire_at: self.expire_at,
        }
    }
}

/// Ordered records and the rotation cursor.
///
/// Invariants, upheld by every method:
/// - `order` holds each key of `records` exactly once
/// - `cursor` is `None` iff `order` is empty, else a valid index into it
#[derive(Debug, Default)]
pub(super) struct RegistryState {
    order: Vec<String>,
    records: HashMap<String, ServiceRecord>,
    cursor: Option<usize>,
    next_timer_id: u64,
}

impl RegistryState {
    /// Inserts or updates a record. Returns true when the name was new.
    pub(super) fn upsert(&mut self, name: &str, value: &str, now: DateTime<Utc>) -> bool {
        if let Some(record) = self.records.get_mut(name) {
            record.value = value.to_string();
            record.last_update = now;
            return false;
        }

        self.order.push(name.to_string());
        self.records.insert(
            name.to_string(),
            ServiceRecord {
                value: value.to_string(),
                last_update: now,
                expire_at: None,
                timer: None,
            },
        );
        if self.cursor.is_none() {
            self.cursor = Some(self.order.len() - 1);
        }
        true
    }

    /// The single removal routine. The removed record's timer is dropped
    /// with it.
    pub(super) fn remove(&mut self, name: &str) -> Option<ServiceRecord> {
        let index = self.order.iter().position(|n| n == name)?;
        self.order.remove(index);
        let record = self.records.remove(name);

        self.cursor = match self.cursor {
            _ if self.order.is_empty() => None,
            Some(0) if index == 0 => Some(self.order.len() - 1),
            Some(cursor) if cursor >= index => Some(cursor - 1),
            other => other,
        };
        record
    }

    /// Moves the cursor one step and returns the entry under it.
    pub(super) fn advance(&mut self) -> Option<ServiceStatus> {
        let len = self.order.len();
        let next = (self.cursor? + 1) % len;
        self.cursor = Some(next);
        let name = &self.order[next];
        self.records.get(name).map(|record| record.status(name))
    }

    pub(super) fn status(&self, name: &str) -> Option<ServiceStatus> {
        self.records.get(name).map(|record| record.status(name))
    }

    pub(super) fn record_mut(&mut self, name: &str) -> Option<&mut ServiceRecord> {
        self.records.get_mut(name)
    }

    pub(super) fn timer_id(&self, name: &str) -> Option<u64> {
        self.records
            .get(name)
            .and_then(|record| record.timer.as_ref())
            .map(|timer| timer.id)
    }

    pub(super) fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub(super) fn allocate_timer_id(&mut self) -> u64 {
        self.next_timer_id += 1;
        self.next_timer_id
    }

    pub(super) fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            services: self.order.clone(),
            cursor: self.cursor,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.order.len()
    }

    /// Panics when an invariant is broken.
    #[cfg(test)]
    pub(super) fn assert_invariants(&self) {
        use std::collections::HashSet;

        let unique: HashSet<&String> = self.order.iter().collect();
        assert_eq!(unique.len(), self.order.len(), "duplicate names in order");
        assert_eq!(
            unique,
            self.records.keys().collect::<HashSet<_>>(),
            "order and records disagree"
        );
        match self.cursor {
            None => assert!(self.order.is_empty(), "cursor unset with entries"),
            Some(cursor) => assert!(cursor < self.order.len(), "cursor out of range"),
        }
    }
}

/// Checks a service name against `[A-Za-z0-9-]{1,32}`.
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "Service name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::InvalidInput(
            "Service name may only contain letters, digits and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Checks a service value: 1 to 100 characters.
pub fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidInput("Value must not be empty".to_string()));
    }
    if value.chars().count() > MAX_VALUE_CHARS {
        return Err(Error::InvalidInput("Value string too long".to_string()));
    }
    Ok(())
}
