//! # Shard Node Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Peer feed and responder throughput
//! └── src/integration/  # Cross-crate flows over one peer feed
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p shard-node-tests
//!
//! # Benchmarks
//! cargo bench -p shard-node-tests
//! ```

pub mod integration;
