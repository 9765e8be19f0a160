//! # Typed-Bus Test Suite
//!
//! Unified test crate for cross-component behaviour.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Order-domain messages, broker doubles, stream helpers
//! └── integration/      # Publisher → broker → source scenarios
//!     ├── scenarios.rs
//!     ├── delivery.rs
//!     ├── lifecycle.rs
//!     └── observability.rs
//! tests/benches/
//! └── envelope_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p bus-tests
//!
//! # By category
//! cargo test -p bus-tests integration::lifecycle::
//!
//! # Benchmarks
//! cargo bench -p bus-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
