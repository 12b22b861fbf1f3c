//! # Herald Types Crate
//!
//! Types shared by every layer of the in-process channel bus.
//!
//! ## Design Principles
//!
//! - **Opaque Payloads**: The bus carries `serde_json::Value` and never looks
//!   inside it. Typed views are built by the binding layer.
//! - **Envelope Carries Correlation**: A request's correlation ID travels in
//!   the `Message` envelope, never mixed into the payload.
//! - **Derived Channels**: Response and error channels are computed from the
//!   base channel plus a role suffix and the correlation ID.

pub mod channel;
pub mod correlation;
pub mod errors;
pub mod message;

pub use channel::{error_channel, response_channel, ERROR_SEGMENT, RESPONSE_SEGMENT};
pub use correlation::CorrelationId;
pub use errors::*;
pub use message::Message;
