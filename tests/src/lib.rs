//! # Herald Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/   # Scenarios spanning bus, bindings and types
//! │   ├── chat.rs        # Bindings sharing a room, replay, teardown
//! │   ├── rpc.rs         # Request/response across crates
//! │   └── concurrency.rs # Many tasks on one bus
//! └── benches/           # Publish and request throughput
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p herald-tests
//! cargo test -p herald-tests integration::rpc
//! cargo bench -p herald-tests
//! ```

#![allow(dead_code)]

pub mod integration;
