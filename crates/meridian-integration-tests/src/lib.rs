//! Integration test crate for the Meridian price engine.
//!
//! This crate has no library code; it only contains integration tests
//! that drive block flows across multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p meridian-integration-tests
//! ```
