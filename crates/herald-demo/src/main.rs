//! # Herald Demo
//!
//! Walks an event bus through its main behaviours and logs what happens.
//!
//! ```text
//! chat_room ──→ once_listener ──→ offline_replay ──→ request_response
//! ```
//!
//! Set `HERALD_BUS_DEBUG=true` to see the bus's own records, and
//! `HERALD_JSON_LOGS=true` for JSON output.

mod scenarios;

use anyhow::{Context, Result};
use herald_bus::{BusConfig, EventBus};
use herald_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let config = BusConfig::from_env();
    info!(
        debug = config.debug,
        max_queue_size = config.max_queue_size,
        "Starting herald demo"
    );
    let bus = EventBus::new(config).context("bus configuration")?;

    scenarios::chat_room(&bus)?;
    scenarios::once_listener(&bus)?;
    scenarios::offline_replay(&bus)?;
    scenarios::request_response(bus.clone()).await?;

    let stats = bus.stats();
    info!(
        stats = %serde_json::to_string(&stats)?,
        "Demo finished"
    );
    bus.clear();
    Ok(())
}
