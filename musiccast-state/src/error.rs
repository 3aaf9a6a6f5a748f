//! Error types for musiccast-state

use thiserror::Error;

use crate::model::{Host, StateCategory};

/// Result type for musiccast-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur while polling or controlling devices
#[derive(Debug, Error)]
pub enum StateError {
    /// Error from the device API
    #[error("API error: {0}")]
    Api(#[from] musiccast_api::ApiError),

    /// A state category was read before it was ever fetched
    #[error("No {category} cached for {host}")]
    NotFound { host: Host, category: StateCategory },

    /// Invalid configuration, fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// The identifier is not a known volume step, input or preset
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(u32),

    /// The scheduler is already running
    #[error("Scheduler is already running")]
    AlreadyRunning,

    /// The scheduler task ended abnormally
    #[error("Scheduler task failed: {0}")]
    TaskFailed(String),
}

impl StateError {
    /// True for errors caused by device communication
    pub fn is_transient(&self) -> bool {
        matches!(self, StateError::Api(_) | StateError::NotFound { .. })
    }
}
