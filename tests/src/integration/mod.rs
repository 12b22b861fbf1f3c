//! Cross-crate scenarios.

pub mod chat;
pub mod concurrency;
pub mod rpc;
