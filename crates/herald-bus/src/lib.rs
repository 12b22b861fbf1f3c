//! # Herald Bus - In-Process Channel Bus
//!
//! Publish/subscribe between unrelated parts of one process, plus a
//! request/response protocol with correlation and timeout.
//!
//! ## Components
//!
//! ```text
//! ┌────────────────────────────── EventBus ──────────────────────────────┐
//! │                                                                       │
//! │  ┌──────────────────┐   ┌────────────────┐   ┌─────────────────────┐ │
//! │  │ ChannelRegistry  │   │ OfflineQueue   │   │ PendingRequestStore │ │
//! │  │ persistent/once  │   │ bounded FIFO   │   │ correlation → timer │ │
//! │  └──────────────────┘   └────────────────┘   └─────────────────────┘ │
//! │        subscribe/once/unsubscribe/publish/publish_async/clear         │
//! │                         request/respond                               │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! | Property | Where |
//! |----------|-------|
//! | Registration-order delivery | `registry.rs` - `take_dispatch()` |
//! | Once handlers fire at most once | `registry.rs` - once set moved out on dispatch |
//! | Offline replay in publish order | `bus.rs` - `subscribe()` |
//! | Queue bound, oldest evicted | `queue.rs` - `push()` |
//! | Handler failures isolated | `handler.rs` - `invoke()` |
//! | Request settles exactly once | `request.rs` - `PendingRequestStore::take()` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use herald_bus::{EventBus, Handler};
//! use serde_json::json;
//!
//! let bus = EventBus::default();
//! let handler = Handler::new(|msg| {
//!     println!("room:1 -> {}", msg.payload);
//!     Ok(())
//! });
//! bus.subscribe("room:1", &handler);
//! bus.publish("room:1", json!({"text": "hello"}));
//! bus.unsubscribe("room:1", Some(&handler));
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

/// Log through `tracing` only when the bus was built with `debug: true`.
macro_rules! bus_log {
    ($bus:expr, $level:ident, $($arg:tt)+) => {
        if $bus.debug_enabled() {
            tracing::$level!($($arg)+);
        }
    };
}

pub mod bus;
pub mod config;
pub mod global;
pub mod handler;
pub mod queue;
pub mod registry;
pub mod request;
pub mod stats;

pub use bus::{EventBus, WeakEventBus};
pub use config::{BusConfig, DEFAULT_MAX_QUEUE_SIZE};
pub use global::global;
pub use handler::{Handler, HandlerResult};
pub use registry::Mode;
pub use request::DEFAULT_REQUEST_TIMEOUT;
pub use stats::StatsSnapshot;

pub use herald_types::{BusError, CorrelationId, HandlerError, Message};
