//! Typed request/response on top of `EventBus::request` and `EventBus::respond`.

use crate::provider::BusProvider;
use herald_bus::{BusError, EventBus, Handler, HandlerError, DEFAULT_REQUEST_TIMEOUT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Issues typed requests on one channel.
pub struct RequestBinding<Req, Res> {
    bus: EventBus,
    channel: String,
    timeout: Duration,
    _marker: PhantomData<fn(&Req) -> Res>,
}

impl<Req, Res> Clone for RequestBinding<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            channel: self.channel.clone(),
            timeout: self.timeout,
            _marker: PhantomData,
        }
    }
}

impl<Req, Res> RequestBinding<Req, Res>
where
    Req: Serialize,
    Res: DeserializeOwned,
{
    pub fn new(bus: &EventBus, channel: impl Into<String>) -> Self {
        Self {
            bus: bus.clone(),
            channel: channel.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            _marker: PhantomData,
        }
    }

    /// Request binding on the bus of the enclosing `BusProvider`.
    ///
    /// # Errors
    ///
    /// `BusError::OutsideProvider` when no provider scope is active.
    pub fn from_scope(channel: impl Into<String>) -> Result<Self, BusError> {
        let bus = BusProvider::current("RequestBinding")?;
        Ok(Self::new(&bus, channel))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `request` and wait for the typed response.
    ///
    /// # Errors
    ///
    /// - `BusError::RequestTimeout` if no response arrives in time
    /// - `BusError::Encode` if the request cannot be serialized
    /// - `BusError::Decode` if the response does not match `Res`
    /// - `BusError::NoRuntime` if polled outside a Tokio runtime
    pub async fn call(&self, request: &Req) -> Result<Res, BusError> {
        let payload = serde_json::to_value(request).map_err(|e| BusError::Encode {
            channel: self.channel.clone(),
            reason: e.to_string(),
        })?;
        let response = self.bus.request(&self.channel, payload, self.timeout).await?;
        serde_json::from_value(response).map_err(|e| BusError::Decode {
            channel: self.channel.clone(),
            reason: e.to_string(),
        })
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A typed responder whose subscription lives as long as the binding.
pub struct ResponderBinding {
    bus: EventBus,
    channel: String,
    handler: Handler,
    enabled: bool,
}

impl ResponderBinding {
    /// Answer requests on `channel` with `handler`.
    ///
    /// Requests that do not decode as `Req` are reported on the error
    /// channel of the request, like any other handler failure.
    pub fn new<Req, Res, F, Fut>(bus: &EventBus, channel: impl Into<String>, handler: F) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, HandlerError>> + Send + 'static,
    {
        let channel = channel.into();
        let handler = Arc::new(handler);
        let responder = bus.respond(&channel, move |payload| {
            let handler = Arc::clone(&handler);
            async move {
                let request: Req = serde_json::from_value(payload)?;
                let response = handler(request).await?;
                Ok(serde_json::to_value(response)?)
            }
        });
        debug!(channel = %channel, "Responder bound");

        Self {
            bus: bus.clone(),
            channel,
            handler: responder,
            enabled: true,
        }
    }

    /// Responder on the bus of the enclosing `BusProvider`.
    ///
    /// # Errors
    ///
    /// `BusError::OutsideProvider` when no provider scope is active.
    pub fn from_scope<Req, Res, F, Fut>(
        channel: impl Into<String>,
        handler: F,
    ) -> Result<Self, BusError>
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, HandlerError>> + Send + 'static,
    {
        let bus = BusProvider::current("ResponderBinding")?;
        Ok(Self::new(&bus, channel, handler))
    }

    /// Stop or resume answering. Requests sent while disabled queue up and
    /// are answered on re-enable if they have not timed out.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.bus.subscribe(&self.channel, &self.handler);
        } else {
            self.bus.unsubscribe(&self.channel, Some(&self.handler));
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Drop for ResponderBinding {
    fn drop(&mut self) {
        if self.enabled {
            self.bus.unsubscribe(&self.channel, Some(&self.handler));
            debug!(channel = %self.channel, "Responder released");
        }
    }
}
