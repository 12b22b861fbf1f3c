//! Bus configuration.

use herald_types::BusError;
use serde::{Deserialize, Serialize};
use std::env;

/// Default per-channel offline queue bound.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Static configuration of an `EventBus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Emit structured log lines for subscribe/unsubscribe/publish/errors.
    pub debug: bool,

    /// Reserved for channel-name transformation. Names currently pass through.
    pub namespace: bool,

    /// Maximum queued offline messages per channel (>= 1).
    pub max_queue_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            debug: false,
            namespace: true,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

impl BusConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HERALD_BUS_DEBUG`: Enable debug logging (default: on in debug builds)
    /// - `HERALD_BUS_NAMESPACE`: Namespace flag (default: true)
    /// - `HERALD_BUS_MAX_QUEUE_SIZE`: Offline queue bound (default: 100)
    pub fn from_env() -> Self {
        Self {
            debug: env::var("HERALD_BUS_DEBUG")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(cfg!(debug_assertions)),

            namespace: env::var("HERALD_BUS_NAMESPACE")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            max_queue_size: env::var("HERALD_BUS_MAX_QUEUE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_QUEUE_SIZE),
        }
    }

    /// Enable or disable debug logging.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the offline queue bound.
    #[must_use]
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Check invariants.
    ///
    /// # Errors
    ///
    /// `BusError::InvalidConfig` if `max_queue_size` is zero.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.max_queue_size == 0 {
            return Err(BusError::InvalidConfig(
                "max_queue_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
