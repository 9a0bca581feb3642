//! The `volley` command line tool.
//!
//! Loads the configuration, runs a load test with [`volley_engine`], and prints the report.

pub mod cli;
pub mod config;
pub mod observability;
pub mod progress;
pub mod report;
