//! # Herald Telemetry
//!
//! Log output for herald processes: a `tracing-subscriber` registry with an
//! `EnvFilter` and a pretty or JSON formatter, configured from the
//! environment.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use herald_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // bus debug logs now reach stdout when HERALD_BUS_DEBUG=true
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HERALD_SERVICE_NAME` | `herald` | Service name in the startup record |
//! | `HERALD_LOG_LEVEL` | `info` | Filter directive (`RUST_LOG` also honoured) |
//! | `HERALD_CONSOLE_OUTPUT` | `true` | Write log lines to stdout |
//! | `HERALD_JSON_LOGS` | `false` | JSON lines instead of pretty output |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber.
///
/// Returns a guard to hold for the lifetime of the application; dropping
/// it records the shutdown.
///
/// # Errors
///
/// - `TelemetryError::Filter` if the level directive does not parse
/// - `TelemetryError::AlreadyInitialized` if a subscriber is already set
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
