//! # Kadmesh Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Node spawning, identity selection, tracing setup
//! ├── benchmarks/       # Criterion benchmarks (run with `cargo bench`)
//! └── integration/      # Multi-node scenarios over loopback TCP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p kadmesh-tests
//!
//! # One scenario group, with logs
//! RUST_LOG=kadmesh_routing=debug cargo test -p kadmesh-tests integration::eviction
//!
//! # Benchmarks
//! cargo bench -p kadmesh-tests
//! ```

pub mod benchmarks;
pub mod integration;
pub mod support;
