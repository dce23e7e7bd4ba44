//! Forwards test-runner lifecycle events to a ReportPortal-style item tracker.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod reporter;
pub mod tracker;
