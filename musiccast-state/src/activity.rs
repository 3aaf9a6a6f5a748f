//! Activity records and the tiered refresh policy
//!
//! Each host carries three timestamps. The scheduler owns
//! `last_status_update`; everything else reports user activity and power-on
//! observations through [`HostCache::ping`](crate::store::HostCache::ping).
//! All three only ever move forward.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Result, StateError};

/// Per-host activity timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityRecord {
    pub last_user_activity: Instant,
    pub last_powered_on: Instant,
    pub last_status_update: Instant,
}

impl ActivityRecord {
    /// A freshly registered host counts as just updated, active and on
    ///
    /// This puts new hosts in the fast tier for their first window so the
    /// first refreshes land quickly.
    pub fn registered_at(now: Instant) -> Self {
        Self {
            last_user_activity: now,
            last_powered_on: now,
            last_status_update: now,
        }
    }

    pub(crate) fn touch_user_activity(&mut self, now: Instant) {
        self.last_user_activity = self.last_user_activity.max(now);
    }

    pub(crate) fn touch_powered_on(&mut self, now: Instant) {
        self.last_powered_on = self.last_powered_on.max(now);
    }

    pub(crate) fn touch_status_update(&mut self, now: Instant) {
        self.last_status_update = self.last_status_update.max(now);
    }
}

/// The three polling cadences and the scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiers {
    /// Floor: every host is refreshed at least this often
    pub off: Duration,
    /// Cadence while the host was powered on within the last `off`
    pub on: Duration,
    /// Cadence while there was user activity within the last `on`
    pub activity: Duration,
    /// How often the scheduler evaluates hosts
    pub tick: Duration,
}

impl Default for PollTiers {
    fn default() -> Self {
        Self {
            off: Duration::from_secs(60),
            on: Duration::from_secs(20),
            activity: Duration::from_secs(1),
            tick: Duration::from_secs(1),
        }
    }
}

impl PollTiers {
    pub fn validate(&self) -> Result<()> {
        if self.tick.is_zero() || self.activity.is_zero() {
            return Err(StateError::Config(
                "tick and activity intervals must be greater than 0".to_string(),
            ));
        }
        if !(self.activity <= self.on && self.on <= self.off) {
            return Err(StateError::Config(format!(
                "poll tiers must satisfy activity <= on <= off (got {:?}, {:?}, {:?})",
                self.activity, self.on, self.off
            )));
        }
        Ok(())
    }

    /// Whether a host with this record should be refreshed at `now`
    pub fn is_due(&self, record: &ActivityRecord, now: Instant) -> bool {
        let since_update = now.saturating_duration_since(record.last_status_update);
        let since_powered_on = now.saturating_duration_since(record.last_powered_on);
        let since_activity = now.saturating_duration_since(record.last_user_activity);

        since_update >= self.off
            || (since_update >= self.on && since_powered_on <= self.off)
            || (since_update >= self.activity && since_activity <= self.on)
    }
}
