//! Process-wide default bus.

use crate::bus::EventBus;
use crate::config::BusConfig;
use lazy_static::lazy_static;
use tracing::warn;

lazy_static! {
    static ref GLOBAL_BUS: EventBus = EventBus::new(BusConfig::from_env()).unwrap_or_else(|e| {
        warn!(error = %e, "Invalid bus configuration in environment, using defaults");
        EventBus::default()
    });
}

/// The default instance, created from `BusConfig::from_env()` on first use.
///
/// Independent buses are created with `EventBus::new`.
pub fn global() -> &'static EventBus {
    &GLOBAL_BUS
}
