//! MusicCast state engine
//!
//! Adaptive polling and state reconciliation for MusicCast receivers behind
//! a home-automation bridge.
//!
//! # Architecture
//!
//! ```text
//! PollScheduler ──tick──▶ MusicCastDevice::refresh ──▶ HostCache
//!       ▲                         │                        │
//!       │ ping                    ▼                        │ get
//!       └────────────── AccessoryBinding ◀── resolver ◀────┘
//! ```
//!
//! - [`HostCache`] owns every host's latest state snapshot and activity
//!   record.
//! - [`PollScheduler`] refreshes each host at one of three cadences: a
//!   60 second floor, 20 seconds after a recent power-on, and every second
//!   after recent user activity.
//! - [`MusicCastDevice`] turns cached state into discrete values for the
//!   control surface and issues commands, waiting for them to converge.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use musiccast_api::MusicCastClient;
//! use musiccast_state::prelude::*;
//!
//! let api = Arc::new(MusicCastClient::builder("192.168.1.20").build()?);
//! let cache = HostCache::new();
//! let scheduler = PollScheduler::new(cache.clone(), PollTiers::default());
//!
//! let device = Arc::new(MusicCastDevice::new(
//!     DeviceConfig::primary("192.168.1.20", inputs, clients),
//!     api,
//!     cache.clone(),
//!     binding,
//!     ConvergenceWaiter::default(),
//! ));
//! device.load_initial_status().await?;
//! device.publish().await?;
//! device.attach(&scheduler);
//! scheduler.start()?;
//! ```

pub mod activity;
pub mod binding;
pub mod choreographer;
pub mod config;
pub mod convergence;
pub mod device;
pub mod error;
pub mod logging;
pub mod model;
pub mod resolver;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use activity::{ActivityRecord, PollTiers};
pub use binding::{
    AccessoryBinding, AccessoryCategory, AccessoryInfo, AccessoryLayout, CharacteristicUpdate,
    SourceEntry, VolumeLayout,
};
pub use choreographer::Choreographer;
pub use config::{
    BridgeConfig, ConvergenceConfig, DeviceConfig, DeviceRole, InputConfig, StepConfig,
    VolumeProfile,
};
pub use convergence::ConvergenceWaiter;
pub use device::MusicCastDevice;
pub use model::{Category, Host, StateCategory};
pub use resolver::{
    resolve_active_identifier, InputSource, VolumeStep, VolumeSteps, INPUT_IDENTIFIER_BASE,
    PRESET_IDENTIFIER_BASE,
};
pub use scheduler::{PollScheduler, RefreshSubscriber, SchedulerStats};
pub use store::{HostCache, HostSnapshot};

pub use error::{Result, StateError};

pub use logging::{init_logging, init_logging_with_level, LoggingError, LoggingMode};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::binding::{AccessoryBinding, AccessoryLayout, CharacteristicUpdate};
    pub use crate::config::{BridgeConfig, DeviceConfig, InputConfig, VolumeProfile};
    pub use crate::convergence::ConvergenceWaiter;
    pub use crate::device::MusicCastDevice;
    pub use crate::model::Host;
    pub use crate::activity::PollTiers;
    pub use crate::scheduler::PollScheduler;
    pub use crate::store::HostCache;
}
