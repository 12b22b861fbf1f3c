//! # Herald Binding - Lifecycle-Safe Subscriptions
//!
//! Typed, owner-scoped views of bus channels.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Binding`] | Subscribe while alive, deregister exactly once on drop |
//! | [`Emitter`] | Publish typed values on one channel |
//! | [`RequestBinding`] | Typed `request()` with its own timeout |
//! | [`ResponderBinding`] | Typed `respond()` that unsubscribes on drop |
//! | [`BusProvider`] | Scope a bus so consumers can find it without plumbing |
//!
//! ```rust,ignore
//! use herald_binding::{Binding, BindingOptions};
//!
//! let room = Binding::listen(&bus, "room:1", BindingOptions::default(), |msg: Chat| {
//!     println!("{}: {}", msg.from, msg.text);
//!     Ok(())
//! });
//! room.emit(&Chat::new("alice", "hi"))?;
//! // dropping `room` removes the subscription
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod binding;
pub mod provider;
pub mod rpc;

pub use binding::{Binding, BindingOptions, Emitter};
pub use provider::BusProvider;
pub use rpc::{RequestBinding, ResponderBinding};
