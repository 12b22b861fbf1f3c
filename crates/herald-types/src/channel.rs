//! Derived channel names.
//!
//! Channels are plain strings. The only structure the bus ever builds into a
//! name is the derived response/error channel of a request:
//!
//! ```text
//! "{base}:response:{correlation_id}"
//! "{base}:error:{correlation_id}"
//! ```

use crate::correlation::CorrelationId;

/// Role segment of a response channel.
pub const RESPONSE_SEGMENT: &str = "response";

/// Role segment of an error channel.
pub const ERROR_SEGMENT: &str = "error";

/// Channel on which the answer to request `id` on `channel` is published.
#[must_use]
pub fn response_channel(channel: &str, id: &CorrelationId) -> String {
    format!("{channel}:{RESPONSE_SEGMENT}:{id}")
}

/// Channel on which a responder failure for request `id` is published.
#[must_use]
pub fn error_channel(channel: &str, id: &CorrelationId) -> String {
    format!("{channel}:{ERROR_SEGMENT}:{id}")
}
