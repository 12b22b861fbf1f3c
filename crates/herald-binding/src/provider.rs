//! # Bus Provider
//!
//! Makes a bus available to everything running inside a scope, so scoped
//! consumers (`Binding::from_scope`, `RequestBinding::from_scope`, ...) do
//! not need the bus passed down explicitly.
//!
//! Using a scoped consumer outside any provider fails fast with
//! `BusError::OutsideProvider` instead of silently doing nothing.

use herald_bus::{BusError, EventBus};
use std::future::Future;

tokio::task_local! {
    static CURRENT_BUS: EventBus;
}

/// Entry points for provider scopes.
pub struct BusProvider;

impl BusProvider {
    /// Run `future` with `bus` as the scoped bus.
    pub async fn scope<F>(bus: EventBus, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_BUS.scope(bus, future).await
    }

    /// Run `f` synchronously with `bus` as the scoped bus.
    pub fn sync_scope<R>(bus: EventBus, f: impl FnOnce() -> R) -> R {
        CURRENT_BUS.sync_scope(bus, f)
    }

    /// The bus of the enclosing scope.
    ///
    /// # Errors
    ///
    /// `BusError::OutsideProvider` naming `consumer` when no scope is active.
    pub fn current(consumer: &'static str) -> Result<EventBus, BusError> {
        CURRENT_BUS
            .try_with(EventBus::clone)
            .map_err(|_| BusError::OutsideProvider { consumer })
    }

    /// Whether a provider scope is active.
    #[must_use]
    pub fn is_active() -> bool {
        CURRENT_BUS.try_with(|_| ()).is_ok()
    }
}
