//! Per-host state snapshots and activity records
//!
//! [`HostCache`] is the single owner of everything the devices share: the
//! latest value of each state category and the activity timestamps that
//! drive the scheduler. Storage is never handed out; callers go through
//! `get`/`set`/`ping`, and no lock is held across an await point.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::error;

use crate::activity::ActivityRecord;
use crate::error::{Result, StateError};
use crate::model::{Category, Host, StateCategory};

// ============================================================================
// HostSnapshot - latest value per category for one host
// ============================================================================

/// Latest fetched value of each category for one host
///
/// A slot is either empty (never fetched) or holds exactly one value; no
/// history is kept.
#[derive(Default)]
pub struct HostSnapshot {
    slots: HashMap<StateCategory, Box<dyn Any + Send + Sync>>,
}

impl HostSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<C: Category>(&self) -> Option<C> {
        self.slots
            .get(&C::CATEGORY)
            .and_then(|boxed| boxed.downcast_ref::<C>())
            .cloned()
    }

    /// Overwrite the slot, returning what was there before
    pub fn replace<C: Category>(&mut self, value: C) -> Option<C> {
        self.slots
            .insert(C::CATEGORY, Box::new(value))
            .and_then(|old| old.downcast::<C>().ok())
            .map(|old| *old)
    }

    pub fn contains(&self, category: StateCategory) -> bool {
        self.slots.contains_key(&category)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for HostSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSnapshot")
            .field("categories", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// HostCache - shared store + activity tracker
// ============================================================================

#[derive(Debug, Default)]
struct Inner {
    snapshots: HashMap<Host, HostSnapshot>,
    activity: HashMap<Host, ActivityRecord>,
}

/// Shared state owner for all hosts
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Debug, Clone, Default)]
pub struct HostCache {
    inner: Arc<RwLock<Inner>>,
}

impl HostCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Snapshot store ====================

    /// Read the latest value of a category
    ///
    /// A missing value is logged and returned as `None`; it is expected
    /// before the first refresh completes.
    pub fn get<C: Category>(&self, host: &Host) -> Option<C> {
        let value = self
            .inner
            .read()
            .snapshots
            .get(host)
            .and_then(|snapshot| snapshot.get::<C>());
        if value.is_none() {
            error!(%host, category = %C::CATEGORY, "cache not found");
        }
        value
    }

    /// Like [`get`](Self::get), but a missing value is an error
    pub fn require<C: Category>(&self, host: &Host) -> Result<C> {
        self.get::<C>(host).ok_or_else(|| StateError::NotFound {
            host: host.clone(),
            category: C::CATEGORY,
        })
    }

    /// Unconditionally overwrite a category
    pub fn set<C: Category>(&self, host: &Host, value: C) {
        self.replace(host, value);
    }

    /// Overwrite a category and return the previous value, if any
    pub fn replace<C: Category>(&self, host: &Host, value: C) -> Option<C> {
        self.inner
            .write()
            .snapshots
            .entry(host.clone())
            .or_default()
            .replace(value)
    }

    /// Whether a category has ever been stored for `host`
    pub fn contains(&self, host: &Host, category: StateCategory) -> bool {
        self.inner
            .read()
            .snapshots
            .get(host)
            .is_some_and(|snapshot| snapshot.contains(category))
    }

    // ==================== Activity tracker ====================

    /// Start tracking `host`, or refresh its timestamps if already tracked
    pub fn register(&self, host: &Host) {
        self.register_at(host, Instant::now());
    }

    pub(crate) fn register_at(&self, host: &Host, now: Instant) {
        let mut inner = self.inner.write();
        match inner.activity.get_mut(host) {
            Some(record) => {
                record.touch_user_activity(now);
                record.touch_powered_on(now);
                record.touch_status_update(now);
            }
            None => {
                inner
                    .activity
                    .insert(host.clone(), ActivityRecord::registered_at(now));
            }
        }
    }

    /// Report an observed event for `host`
    ///
    /// `powered_on` bumps the power-on timestamp, `user_activity` bumps the
    /// activity timestamp; `false` leaves the respective timestamp alone.
    /// Pings for hosts that were never registered are ignored.
    pub fn ping(&self, host: &Host, powered_on: bool, user_activity: bool) {
        self.ping_at(host, powered_on, user_activity, Instant::now());
    }

    pub(crate) fn ping_at(&self, host: &Host, powered_on: bool, user_activity: bool, now: Instant) {
        let mut inner = self.inner.write();
        let Some(record) = inner.activity.get_mut(host) else {
            return;
        };
        if powered_on {
            record.touch_powered_on(now);
        }
        if user_activity {
            record.touch_user_activity(now);
        }
    }

    pub fn activity(&self, host: &Host) -> Option<ActivityRecord> {
        self.inner.read().activity.get(host).copied()
    }

    /// Record that a refresh fired for `host`; scheduler only
    pub(crate) fn mark_refreshed(&self, host: &Host, now: Instant) {
        if let Some(record) = self.inner.write().activity.get_mut(host) {
            record.touch_status_update(now);
        }
    }
}
