//! Test utilities for volley.
//!
//! This crate provides utilities to facilitate testing of the load generation engine and the
//! `volley` command line tool. See the modules for all available utilities.

pub mod server;
pub mod tracing;
