//! # flatrel-timelog
//!
//! Time tracking stored with flatrel-store: tasks, the intervals logged
//! against them, and reports over a recent window.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Command-line timestamps
pub mod clock;

/// Configuration
pub mod config;

/// Task and log storage
pub mod journal;

/// Record types
pub mod models;

/// Reports and duration formatting
pub mod report;

pub use config::TimelogConfig;
pub use journal::Journal;
pub use models::{Log, Task};
pub use report::{pretty_duration, Period};
