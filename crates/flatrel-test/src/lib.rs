//! # flatrel-test
//!
//! End-to-end tests for flatrel.
//!
//! This crate contains:
//! - Shared fixtures (a catalog in a scratch directory, sample schemas)
//! - Scenario tests under `tests/`

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test fixtures and helpers
pub mod fixtures;
