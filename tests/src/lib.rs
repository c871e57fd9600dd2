//! # XBridge Test Suite
//!
//! ```text
//! tests/
//! ├── benches/          # criterion benchmarks
//! └── src/integration/  # simnet-backed flows across crates
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p xb-tests
//! cargo test -p xb-tests integration::mesh
//! cargo bench -p xb-tests
//! ```

pub mod integration;
