//! # Event Bus Core
//!
//! Owns the Channel Registry, the Offline Queue and the pending request
//! table, and exposes the publish/subscribe surface.
//!
//! ## Dispatch Rules
//!
//! - Handlers run in registration order, persistent before once.
//! - Every dispatch works on a snapshot taken under the state lock; the lock
//!   is released before any handler runs, so handlers may subscribe,
//!   unsubscribe, publish or `clear()` re-entrantly.
//! - A failing or panicking handler is logged and counted. It never stops
//!   delivery to its siblings and never reaches the publisher.
//! - A publish that finds no handler at all is parked in the Offline Queue
//!   and replayed by the next `subscribe` on that channel.

use crate::config::BusConfig;
use crate::handler::{Handler, Invocation};
use crate::queue::OfflineQueue;
use crate::registry::{ChannelRegistry, Dispatch, Mode};
use crate::request::PendingRequestStore;
use crate::stats::{BusStats, StatsSnapshot};
use herald_types::{BusError, HandlerError, Message};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// Mutable bus state guarded by one lock.
pub(crate) struct BusState {
    pub(crate) registry: ChannelRegistry,
    pub(crate) queue: OfflineQueue,
}

pub(crate) struct Inner {
    pub(crate) config: BusConfig,
    pub(crate) state: Mutex<BusState>,
    pub(crate) pending: PendingRequestStore,
    pub(crate) stats: BusStats,
}

/// Handle to an in-process channel bus.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct EventBus {
    pub(crate) inner: Arc<Inner>,
}

/// Non-owning handle, used by callbacks the bus itself stores.
#[derive(Clone)]
pub struct WeakEventBus(Weak<Inner>);

impl WeakEventBus {
    #[must_use]
    pub fn upgrade(&self) -> Option<EventBus> {
        self.0.upgrade().map(|inner| EventBus { inner })
    }
}

impl EventBus {
    /// Create a bus with the given configuration.
    ///
    /// # Errors
    ///
    /// `BusError::InvalidConfig` if the configuration is rejected.
    pub fn new(config: BusConfig) -> Result<Self, BusError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BusConfig) -> Self {
        let queue = OfflineQueue::new(config.max_queue_size);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(BusState {
                    registry: ChannelRegistry::new(),
                    queue,
                }),
                pending: PendingRequestStore::new(),
                stats: BusStats::default(),
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus(Arc::downgrade(&self.inner))
    }

    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    pub(crate) fn debug_enabled(&self) -> bool {
        self.inner.config.debug
    }

    /// Channel-name normalisation hook. Names pass through unchanged.
    fn normalize<'a>(&self, channel: &'a str) -> &'a str {
        channel
    }

    // =========================================================================
    // SUBSCRIPTION
    // =========================================================================

    /// Register a persistent handler.
    ///
    /// Messages queued while `channel` had no subscriber are delivered to
    /// every handler of the channel, in publish order, before this returns.
    pub fn subscribe(&self, channel: &str, handler: &Handler) {
        let channel = self.normalize(channel);

        let (handlers, backlog) = {
            let mut state = self.inner.state.lock();
            state.registry.add(channel, handler, Mode::Persistent);
            let backlog = state.queue.drain(channel);
            (state.registry.count(Some(channel)), backlog)
        };

        bus_log!(self, debug, channel = %channel, handlers, "Subscribed");

        if !backlog.is_empty() {
            bus_log!(self, debug, channel = %channel, queued = backlog.len(), "Replaying offline queue");
            for message in backlog {
                self.dispatch(channel, message);
            }
        }
    }

    /// Register a handler for the next delivery only.
    ///
    /// Unlike `subscribe`, this does not replay the offline queue.
    pub fn once(&self, channel: &str, handler: &Handler) {
        let channel = self.normalize(channel);
        let handlers = {
            let mut state = self.inner.state.lock();
            state.registry.add(channel, handler, Mode::Once);
            state.registry.count(Some(channel))
        };
        bus_log!(self, debug, channel = %channel, handlers, "Subscribed once");
    }

    /// Remove `handler` from `channel`, or with `None` remove every handler
    /// and every queued message of `channel`. Unknown handlers are ignored.
    pub fn unsubscribe(&self, channel: &str, handler: Option<&Handler>) {
        let channel = self.normalize(channel);
        let mut state = self.inner.state.lock();
        match handler {
            Some(handler) => {
                let removed = state.registry.remove(channel, handler);
                drop(state);
                bus_log!(self, debug, channel = %channel, removed, "Unsubscribed");
            }
            None => {
                let removed = state.registry.remove_channel(channel);
                let discarded = state.queue.discard(channel);
                drop(state);
                bus_log!(self, debug, channel = %channel, removed, discarded, "Removed all listeners");
            }
        }
    }

    // =========================================================================
    // PUBLISHING
    // =========================================================================

    /// Deliver `payload` synchronously to every handler on `channel`.
    ///
    /// Asynchronous handlers are spawned onto the current Tokio runtime.
    pub fn publish(&self, channel: &str, payload: Value) {
        self.dispatch(self.normalize(channel), Message::new(payload));
    }

    /// Deliver `payload` and wait until every handler has settled.
    pub async fn publish_async(&self, channel: &str, payload: Value) {
        let channel = self.normalize(channel);
        let message = Message::new(payload);
        bus_log!(self, debug, channel = %channel, payload = %message.payload, "Publishing (async)");

        let Some(dispatch) = self.snapshot_or_enqueue(channel, &message) else {
            return;
        };

        let pending: Vec<_> = dispatch
            .handlers()
            .map(|handler| handler.invoke(&message).into_future())
            .collect();
        let results = futures::future::join_all(pending).await;

        for result in results {
            if let Err(err) = result {
                self.handler_failed(channel, &err);
            }
        }
    }

    /// Synchronous fan-out used by `publish`, replay and the request protocol.
    pub(crate) fn dispatch(&self, channel: &str, message: Message) {
        bus_log!(self, debug, channel = %channel, payload = %message.payload, "Publishing");

        let Some(dispatch) = self.snapshot_or_enqueue(channel, &message) else {
            return;
        };

        for handler in dispatch.handlers() {
            match handler.invoke(&message) {
                Invocation::Done(Ok(())) => {}
                Invocation::Done(Err(err)) => self.handler_failed(channel, &err),
                Invocation::Pending(fut) => match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let bus = self.downgrade();
                        let channel = channel.to_string();
                        runtime.spawn(async move {
                            if let Err(err) = fut.await {
                                if let Some(bus) = bus.upgrade() {
                                    bus.handler_failed(&channel, &err);
                                }
                            }
                        });
                    }
                    Err(_) => self.handler_failed(channel, &HandlerError::NoRuntime),
                },
            }
        }
    }

    /// Take the delivery snapshot, or park the message if nobody listens.
    fn snapshot_or_enqueue(&self, channel: &str, message: &Message) -> Option<Dispatch> {
        BusStats::incr(&self.inner.stats.published);

        let mut state = self.inner.state.lock();
        if !state.registry.has_listeners(channel) {
            let evicted = state.queue.push(channel, message.clone());
            let queued = state.queue.len(channel);
            drop(state);

            BusStats::incr(&self.inner.stats.queued);
            bus_log!(self, debug, channel = %channel, queued, "No listeners, message queued");
            if evicted.is_some() {
                BusStats::incr(&self.inner.stats.evicted);
                bus_log!(self, warn, channel = %channel, "Offline queue full, oldest message evicted");
            }
            return None;
        }

        let dispatch = state.registry.take_dispatch(channel);
        drop(state);

        BusStats::add(&self.inner.stats.delivered, dispatch.len() as u64);
        Some(dispatch)
    }

    pub(crate) fn handler_failed(&self, channel: &str, err: &HandlerError) {
        BusStats::incr(&self.inner.stats.handler_failures);
        bus_log!(self, error, channel = %channel, error = %err, "Handler failed");
    }

    // =========================================================================
    // LIFECYCLE & INTROSPECTION
    // =========================================================================

    /// Remove every subscription and queued message, and cancel every
    /// pending request's timer without completing it.
    pub fn clear(&self) {
        {
            let mut state = self.inner.state.lock();
            state.registry.clear();
            state.queue.clear();
        }
        let cancelled = self.inner.pending.cancel_all();
        bus_log!(self, debug, cancelled_requests = cancelled, "Bus cleared");
    }

    /// Handlers on `channel`, or across all channels with `None`.
    #[must_use]
    pub fn listener_count(&self, channel: Option<&str>) -> usize {
        let channel = channel.map(|c| self.normalize(c));
        self.inner.state.lock().registry.count(channel)
    }

    /// Channels with at least one handler, sorted.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.inner.state.lock().registry.channels()
    }

    /// Messages waiting in the offline queue of `channel`.
    #[must_use]
    pub fn queued_len(&self, channel: &str) -> usize {
        self.inner.state.lock().queue.len(self.normalize(channel))
    }

    /// Messages waiting in the offline queue across all channels.
    ///
    /// Includes late responses and responder errors parked on derived
    /// channels; see [`EventBus::respond`].
    #[must_use]
    pub fn queued_total(&self) -> usize {
        self.inner.state.lock().queue.total()
    }

    /// Requests still waiting for a response or a timeout.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::build(BusConfig::default())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.inner.config)
            .field("listeners", &self.listener_count(None))
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}
