//! # Request/Response Protocol
//!
//! Turns the one-way bus into an RPC-like call.
//!
//! ## Flow
//!
//! ```text
//! requester                         bus                          responder
//!    │ request(c, p, t)              │                                │
//!    │── once(c:response:id) ───────→│                                │
//!    │── spawn timer(t) ─┐           │                                │
//!    │── publish(c, p, id) ─────────→│──────────────────────────────→ │
//!    │                   │           │←── publish(c:response:id, r) ──│
//!    │←── Ok(r) ─────────┼───────────│   (listener aborts the timer)  │
//!    │                   └─ fires ──→ Err(RequestTimeout)             │
//!    │                      (removes the listener)                    │
//! ```
//!
//! ## State Machine
//!
//! `Sent → (Responded | TimedOut)`. Both terminal transitions start by
//! removing the record from the pending table; whichever path removes it
//! wins and the other finds nothing to do.

use crate::bus::EventBus;
use crate::handler::Handler;
use crate::stats::BusStats;
use dashmap::DashMap;
use herald_types::{
    error_channel, response_channel, BusError, CorrelationId, HandlerError, Message,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Timeout used by callers that do not pick one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// A request waiting for its response or its timeout.
pub(crate) struct PendingRequest {
    /// Completes the caller's `request()` future.
    completion: oneshot::Sender<Result<Value, BusError>>,
    /// Timer task; aborted when the response wins.
    timer: Option<AbortHandle>,
    /// Base channel (for errors and logs).
    channel: String,
    /// Derived channel the listener is registered on.
    response_channel: String,
    /// Once-listener on `response_channel`.
    listener: Handler,
    issued_at: Instant,
}

/// Correlation ID → pending request.
pub(crate) struct PendingRequestStore {
    pending: DashMap<CorrelationId, PendingRequest>,
}

impl PendingRequestStore {
    pub(crate) fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    fn insert(&self, id: CorrelationId, request: PendingRequest) {
        self.pending.insert(id, request);
    }

    fn attach_timer(&self, id: &CorrelationId, timer: AbortHandle) {
        match self.pending.get_mut(id) {
            Some(mut request) => request.timer = Some(timer),
            // Already settled; the timer has nothing left to guard.
            None => timer.abort(),
        }
    }

    /// Claim the record. At most one caller ever gets `Some`.
    fn take(&self, id: &CorrelationId) -> Option<PendingRequest> {
        self.pending.remove(id).map(|(_, request)| request)
    }

    /// Abort every timer and drop every record without completing it.
    pub(crate) fn cancel_all(&self) -> usize {
        let ids: Vec<CorrelationId> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut cancelled = 0;
        for id in ids {
            if let Some(request) = self.take(&id) {
                if let Some(timer) = request.timer {
                    timer.abort();
                }
                cancelled += 1;
            }
        }
        cancelled
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

impl EventBus {
    /// Publish `payload` on `channel` tagged with a fresh correlation ID and
    /// wait for the first payload published on the derived response channel.
    ///
    /// # Errors
    ///
    /// - `BusError::RequestTimeout` if no response arrives within `timeout`.
    ///   A request discarded by `clear()` also ends in a timeout once its
    ///   window has elapsed.
    /// - `BusError::NoRuntime` if polled outside a Tokio runtime. Nothing is
    ///   registered or published in that case.
    pub async fn request(
        &self,
        channel: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, BusError> {
        // The timer needs a Tokio runtime; check before any state is touched.
        let Ok(runtime) = Handle::try_current() else {
            bus_log!(self, error, channel = %channel, "Request issued outside a Tokio runtime");
            return Err(BusError::NoRuntime {
                channel: channel.to_string(),
            });
        };

        let id = CorrelationId::new();
        let reply_channel = response_channel(channel, &id);
        let deadline = Instant::now() + timeout;
        let (completion, outcome) = oneshot::channel();

        let listener = {
            let bus = self.downgrade();
            Handler::new(move |message: &Message| {
                let Some(bus) = bus.upgrade() else {
                    return Ok(());
                };
                if let Some(request) = bus.inner.pending.take(&id) {
                    if let Some(timer) = request.timer {
                        timer.abort();
                    }
                    BusStats::incr(&bus.inner.stats.requests_responded);
                    bus_log!(
                        bus,
                        debug,
                        channel = %request.channel,
                        correlation_id = %id,
                        elapsed_ms = request.issued_at.elapsed().as_millis() as u64,
                        "Request answered"
                    );
                    let _ = request.completion.send(Ok(message.payload.clone()));
                }
                Ok(())
            })
        };

        self.inner.pending.insert(
            id,
            PendingRequest {
                completion,
                timer: None,
                channel: channel.to_string(),
                response_channel: reply_channel.clone(),
                listener: listener.clone(),
                issued_at: Instant::now(),
            },
        );
        self.once(&reply_channel, &listener);

        let timer = {
            let bus = self.downgrade();
            runtime.spawn(async move {
                tokio::time::sleep_until(deadline).await;
                let Some(bus) = bus.upgrade() else {
                    return;
                };
                if let Some(request) = bus.inner.pending.take(&id) {
                    bus.unsubscribe(&request.response_channel, Some(&request.listener));
                    BusStats::incr(&bus.inner.stats.requests_timed_out);
                    bus_log!(
                        bus,
                        warn,
                        channel = %request.channel,
                        correlation_id = %id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Request timed out"
                    );
                    let _ = request.completion.send(Err(BusError::RequestTimeout {
                        channel: request.channel,
                        timeout_ms: timeout.as_millis() as u64,
                    }));
                }
            })
            .abort_handle()
        };
        self.inner.pending.attach_timer(&id, timer);

        BusStats::incr(&self.inner.stats.requests_issued);
        bus_log!(self, debug, channel = %channel, correlation_id = %id, "Request sent");
        self.dispatch(channel, Message::request(payload, id));

        match outcome.await {
            Ok(result) => result,
            Err(_) => {
                // Discarded by clear(): the caller still sees a timeout.
                tokio::time::sleep_until(deadline).await;
                Err(BusError::RequestTimeout {
                    channel: channel.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Serve requests on `channel`.
    ///
    /// `handler` receives the request payload with the correlation ID
    /// stripped. `Ok(value)` is published on the derived response channel;
    /// `Err(e)` is logged and its text published on the derived error
    /// channel, which requesters do not listen to, so they time out.
    /// Messages without a correlation ID are logged and dropped.
    ///
    /// Derived channels follow normal publish rules. Error texts, and
    /// responses that arrive after their requester timed out, find no
    /// listener and are parked in the offline queue under a channel name
    /// unique to that request. Each such channel holds at most one entry,
    /// but the number of channels grows with every failed or late request
    /// until `clear()` or `unsubscribe(derived, None)`. Watch
    /// [`EventBus::queued_total`] on long-lived buses.
    ///
    /// Returns the registered handler so the caller can unsubscribe it.
    pub fn respond<F, Fut>(&self, channel: &str, handler: F) -> Handler
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let bus = self.downgrade();
        let base = channel.to_string();

        let responder = Handler::from_async(move |message: Message| {
            let handler = Arc::clone(&handler);
            let bus = bus.clone();
            let base = base.clone();
            async move {
                let Some(bus) = bus.upgrade() else {
                    return Ok(());
                };
                let (payload, correlation_id) = message.into_parts();
                let Some(id) = correlation_id else {
                    bus_log!(bus, warn, channel = %base, "Responder received message without correlation ID");
                    return Ok(());
                };

                match handler(payload).await {
                    Ok(response) => bus.publish(&response_channel(&base, &id), response),
                    Err(err) => {
                        bus_log!(bus, error, channel = %base, correlation_id = %id, error = %err, "Responder failed");
                        bus.publish(&error_channel(&base, &id), Value::String(err.to_string()));
                    }
                }
                Ok(())
            }
        });

        self.subscribe(channel, &responder);
        responder
    }
}
