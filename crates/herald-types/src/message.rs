//! # Message Envelope
//!
//! The unit delivered to every handler. The payload is opaque to the bus;
//! the optional correlation ID is set only on messages published by
//! `request()`.

use crate::correlation::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A published message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque payload (`Value::Null` when the publisher sent none).
    pub payload: Value,

    /// Present when the message is a request awaiting a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl Message {
    /// Plain message without correlation.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            correlation_id: None,
        }
    }

    /// Request message carrying `correlation_id`.
    #[must_use]
    pub fn request(payload: Value, correlation_id: CorrelationId) -> Self {
        Self {
            payload,
            correlation_id: Some(correlation_id),
        }
    }

    /// Split into payload and correlation ID.
    #[must_use]
    pub fn into_parts(self) -> (Value, Option<CorrelationId>) {
        (self.payload, self.correlation_id)
    }
}

impl From<Value> for Message {
    fn from(payload: Value) -> Self {
        Self::new(payload)
    }
}
