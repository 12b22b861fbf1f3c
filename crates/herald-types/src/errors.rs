//! # Error Types
//!
//! Handler failures are isolated at the dispatch boundary and never reach a
//! publisher. `BusError` is what callers of the bus API actually see.

use thiserror::Error;

/// Failure raised inside a subscriber.
///
/// Caught by the bus, logged when debug is enabled, counted, and never
/// propagated to the publisher or to sibling handlers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("Handler failed: {0}")]
    Failed(String),

    /// The handler panicked.
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// The payload could not be decoded into the handler's type.
    #[error("Payload decode failed: {0}")]
    Decode(String),

    /// An asynchronous handler was published synchronously outside a Tokio runtime.
    #[error("No Tokio runtime available to drive asynchronous handler")]
    NoRuntime,
}

impl HandlerError {
    /// Shorthand for `HandlerError::Failed`.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed(reason.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors surfaced by the bus API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// No response arrived on the derived response channel in time.
    #[error("Request timed out: no response on {channel} within {timeout_ms}ms")]
    RequestTimeout { channel: String, timeout_ms: u64 },

    /// Rejected bus configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A scoped consumer was used with no enclosing `BusProvider`.
    #[error("{consumer} must be used inside a BusProvider scope")]
    OutsideProvider { consumer: &'static str },

    /// A received payload could not be decoded into the caller's type.
    #[error("Payload decode failed on {channel}: {reason}")]
    Decode { channel: String, reason: String },

    /// The caller's value could not be encoded as a payload.
    #[error("Payload encode failed on {channel}: {reason}")]
    Encode { channel: String, reason: String },

    /// `request` was polled outside a Tokio runtime, so no timer could be armed.
    #[error("Request on {channel} needs a Tokio runtime")]
    NoRuntime { channel: String },
}
