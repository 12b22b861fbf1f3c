//! # Subscription Binding
//!
//! Ties a bus subscription to the lifetime of its owner.
//!
//! ## Lifecycle
//!
//! ```text
//!   new/listen ──→ [Active] ──set_enabled(false)──→ [Idle]
//!                    │  ↑                              │
//!                    │  └──────set_enabled(true)───────┘
//!                    │
//!   rebind/set_once ─┤  (old registration torn down, new one made)
//!                    │
//!   drop/unbind ─────┴──→ [Released]   (deregistered exactly once)
//! ```
//!
//! The bus only ever sees one stable trampoline handler per activation.
//! `set_callback` swaps the callback the trampoline forwards to without
//! touching the registration, so owners that re-derive their callback on
//! every update do not pile up duplicate subscriptions.

use crate::provider::BusProvider;
use futures::future::{BoxFuture, FutureExt};
use herald_bus::{BusError, EventBus, Handler, HandlerResult, Message};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Registration options of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingOptions {
    /// Register as a once-subscription instead of a persistent one.
    pub once: bool,
    /// Whether the binding is subscribed at all.
    pub enabled: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            once: false,
            enabled: true,
        }
    }
}

impl BindingOptions {
    #[must_use]
    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

type SyncCallback<T> = Arc<dyn Fn(T) -> HandlerResult + Send + Sync>;
type AsyncCallback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

enum Callback<T> {
    Sync(SyncCallback<T>),
    Async(AsyncCallback<T>),
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(Arc::clone(f)),
            Self::Async(f) => Self::Async(Arc::clone(f)),
        }
    }
}

impl<T> Callback<T> {
    fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

/// The subscription currently held on the bus.
struct Registration {
    channel: String,
    once: bool,
    is_async: bool,
    trampoline: Handler,
    /// Set by the trampoline on delivery. A fired once-registration has
    /// already been removed by the bus.
    fired: Arc<AtomicBool>,
}

impl Registration {
    fn is_live(&self) -> bool {
        !(self.once && self.fired.load(Ordering::Acquire))
    }
}

/// A lifetime-bound, typed view of one channel.
pub struct Binding<T> {
    bus: EventBus,
    channel: String,
    options: BindingOptions,
    callback: Arc<RwLock<Option<Callback<T>>>>,
    registration: Option<Registration>,
}

impl<T> Binding<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Publish-only binding: no callback, no subscription.
    pub fn new(bus: &EventBus, channel: impl Into<String>, options: BindingOptions) -> Self {
        Self {
            bus: bus.clone(),
            channel: channel.into(),
            options,
            callback: Arc::new(RwLock::new(None)),
            registration: None,
        }
    }

    /// Binding that delivers every message on `channel` to `callback`.
    pub fn listen<F>(
        bus: &EventBus,
        channel: impl Into<String>,
        options: BindingOptions,
        callback: F,
    ) -> Self
    where
        F: Fn(T) -> HandlerResult + Send + Sync + 'static,
    {
        let mut binding = Self::new(bus, channel, options);
        binding.set_callback(callback);
        binding
    }

    /// Binding whose callback returns a future.
    pub fn listen_async<F, Fut>(
        bus: &EventBus,
        channel: impl Into<String>,
        options: BindingOptions,
        callback: F,
    ) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let mut binding = Self::new(bus, channel, options);
        binding.set_async_callback(callback);
        binding
    }

    /// Publish-only binding on the bus of the enclosing `BusProvider`.
    ///
    /// # Errors
    ///
    /// `BusError::OutsideProvider` when no provider scope is active.
    pub fn from_scope(channel: impl Into<String>, options: BindingOptions) -> Result<Self, BusError> {
        let bus = BusProvider::current("Binding")?;
        Ok(Self::new(&bus, channel, options))
    }

    /// Listening binding on the bus of the enclosing `BusProvider`.
    ///
    /// # Errors
    ///
    /// `BusError::OutsideProvider` when no provider scope is active.
    pub fn listen_in_scope<F>(
        channel: impl Into<String>,
        options: BindingOptions,
        callback: F,
    ) -> Result<Self, BusError>
    where
        F: Fn(T) -> HandlerResult + Send + Sync + 'static,
    {
        let bus = BusProvider::current("Binding")?;
        Ok(Self::listen(&bus, channel, options, callback))
    }

    // =========================================================================
    // CALLBACK
    // =========================================================================

    /// Install or replace the callback. Does not re-subscribe when a
    /// synchronous callback was already installed.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: Fn(T) -> HandlerResult + Send + Sync + 'static,
    {
        self.install(Callback::Sync(Arc::new(callback)));
    }

    /// Install or replace an asynchronous callback.
    pub fn set_async_callback<F, Fut>(&mut self, callback: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.install(Callback::Async(Arc::new(move |value| callback(value).boxed())));
    }

    /// Remove the callback, turning this into a publish-only binding.
    pub fn clear_callback(&mut self) {
        *self.callback.write() = None;
        self.sync();
    }

    fn install(&mut self, callback: Callback<T>) {
        *self.callback.write() = Some(callback);
        self.sync();
    }

    // =========================================================================
    // ACTIVATION
    // =========================================================================

    /// Subscribe (`true`) or tear the subscription down (`false`).
    pub fn set_enabled(&mut self, enabled: bool) {
        self.options.enabled = enabled;
        self.sync();
    }

    /// Switch between once and persistent registration.
    pub fn set_once(&mut self, once: bool) {
        self.options.once = once;
        self.sync();
    }

    /// Move the binding to another channel.
    ///
    /// Emitters obtained earlier keep publishing on their original channel.
    pub fn rebind(&mut self, channel: impl Into<String>) {
        self.channel = channel.into();
        self.sync();
    }

    /// Bring the bus registration in line with channel, options and callback.
    fn sync(&mut self) {
        let wanted = {
            let callback = self.callback.read();
            match (&*callback, self.options.enabled) {
                (Some(cb), true) => Some(cb.is_async()),
                _ => None,
            }
        };

        let Some(is_async) = wanted else {
            self.unbind();
            return;
        };

        if let Some(current) = &self.registration {
            if current.is_live()
                && current.channel == self.channel
                && current.once == self.options.once
                && current.is_async == is_async
            {
                return;
            }
        }

        self.unbind();
        let fired = Arc::new(AtomicBool::new(false));
        let trampoline = self.trampoline(is_async, Arc::clone(&fired));
        if self.options.once {
            self.bus.once(&self.channel, &trampoline);
        } else {
            self.bus.subscribe(&self.channel, &trampoline);
        }
        debug!(channel = %self.channel, once = self.options.once, "Binding established");
        self.registration = Some(Registration {
            channel: self.channel.clone(),
            once: self.options.once,
            is_async,
            trampoline,
            fired,
        });
    }

    /// Handler registered on the bus; forwards to whatever callback is
    /// current at delivery time.
    fn trampoline(&self, is_async: bool, fired: Arc<AtomicBool>) -> Handler {
        let slot = Arc::clone(&self.callback);
        if is_async {
            Handler::from_async(move |message: Message| {
                fired.store(true, Ordering::Release);
                let current = slot.read().clone();
                async move {
                    match current {
                        Some(Callback::Async(f)) => f(serde_json::from_value(message.payload)?).await,
                        Some(Callback::Sync(f)) => f(serde_json::from_value(message.payload)?),
                        None => Ok(()),
                    }
                }
            })
        } else {
            Handler::new(move |message: &Message| {
                fired.store(true, Ordering::Release);
                let current = slot.read().clone();
                match current {
                    Some(Callback::Sync(f)) => f(serde_json::from_value(message.payload.clone())?),
                    // Flavour changed; the next sync() swaps the trampoline.
                    Some(Callback::Async(_)) | None => Ok(()),
                }
            })
        }
    }

    // =========================================================================
    // PUBLISHING & INTROSPECTION
    // =========================================================================

    /// Publisher closed over the currently bound channel.
    #[must_use]
    pub fn emitter(&self) -> Emitter<T> {
        Emitter::new(&self.bus, self.channel.clone())
    }

    /// Publish `value` on the bound channel.
    ///
    /// # Errors
    ///
    /// `BusError::Encode` if `value` cannot be serialized.
    pub fn emit(&self, value: &T) -> Result<(), BusError> {
        self.emitter().emit(value)
    }

    /// Whether the binding currently holds a subscription. A once binding
    /// stops being active when it fires; `set_enabled(true)` re-arms it.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registration.as_ref().is_some_and(Registration::is_live)
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[must_use]
    pub fn options(&self) -> BindingOptions {
        self.options
    }
}

impl<T> Binding<T> {
    /// Deregister now. Idempotent; also runs on drop.
    pub fn unbind(&mut self) {
        if let Some(registration) = self.registration.take() {
            self.bus
                .unsubscribe(&registration.channel, Some(&registration.trampoline));
            debug!(channel = %registration.channel, "Binding released");
        }
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        self.unbind();
    }
}

/// Publishes typed values on one channel.
pub struct Emitter<T> {
    bus: EventBus,
    channel: String,
    _marker: PhantomData<fn(&T)>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            channel: self.channel.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize> Emitter<T> {
    pub fn new(bus: &EventBus, channel: impl Into<String>) -> Self {
        Self {
            bus: bus.clone(),
            channel: channel.into(),
            _marker: PhantomData,
        }
    }

    fn encode(&self, value: &T) -> Result<serde_json::Value, BusError> {
        serde_json::to_value(value).map_err(|e| BusError::Encode {
            channel: self.channel.clone(),
            reason: e.to_string(),
        })
    }

    /// Publish synchronously.
    ///
    /// # Errors
    ///
    /// `BusError::Encode` if `value` cannot be serialized.
    pub fn emit(&self, value: &T) -> Result<(), BusError> {
        let payload = self.encode(value)?;
        self.bus.publish(&self.channel, payload);
        Ok(())
    }

    /// Publish and wait for every handler to settle.
    ///
    /// # Errors
    ///
    /// `BusError::Encode` if `value` cannot be serialized.
    pub async fn emit_async(&self, value: &T) -> Result<(), BusError> {
        let payload = self.encode(value)?;
        self.bus.publish_async(&self.channel, payload).await;
        Ok(())
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }
}
