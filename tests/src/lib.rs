//! # Shared Objects Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/   # Cross-crate flows
//! │   ├── bus_flows.rs          # Communicator under concurrent load
//! │   └── repository_flows.rs   # Provider and repository lifecycles
//! │
//! └── benches/           # Criterion benchmarks
//!     └── bus_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p shared-tests
//! cargo test -p shared-tests integration::bus_flows
//!
//! # Benchmarks
//! cargo bench -p shared-tests
//! ```
