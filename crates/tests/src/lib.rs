//! Integration tests for the Pulse alerting core.
//!
//! This crate contains the cross-component test modules:
//!
//! - `alerting_tests`: alert lifecycle tests covering dedup, resolution, boundary
//!   inclusivity, lock contention, and failure isolation
//! - `histogram_proptest`: property-based tests for the online histogram
//!   (percentile tolerance, round-trip law, merge order independence)
//! - `mock_infrastructure`: reusable scripted collaborators (aggregate and
//!   gauge repositories, capturing notification sender) and the
//!   [`AlertHarness`](mock_infrastructure::AlertHarness) wiring them to an
//!   evaluator
//!
//! ## Running tests
//!
//! ```bash
//! cargo test --package tests
//! ```


#[cfg(test)]
mod alerting_tests;
