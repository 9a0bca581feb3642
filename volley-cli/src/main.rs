//! A load generator for HTTP services.
//!
//! Sends a fixed number of requests to a single URL with bounded concurrency and prints a summary
//! of status codes, errors, latency percentiles and throughput.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use anyhow::Result;

fn main() -> Result<()> {
    volley::cli::execute()
}
