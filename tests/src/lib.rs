//! # Laser Shop Sync Test Suite
//!
//! Unified test crate for flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs       # manager + store + bus + refresh listener
//!     └── http_flow.rs   # manager against a mock REST backend
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lc-tests
//! cargo test -p lc-tests integration::http_flow
//! ```

pub mod integration;
