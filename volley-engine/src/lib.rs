//! A load generation engine for HTTP services.
//!
//! The engine sends a fixed number of requests to a single target, with a bounded number of
//! requests in flight at any time, and accounts for every request in a final [`Summary`]:
//! responses per status code, latency percentiles, and the number of requests that failed to
//! obtain a response at all.
//!
//! There are two entry points:
//!
//! - [`run`] waits for the load test to finish and returns its [`Summary`].
//! - [`start`] returns an [`EventStream`] immediately, which reports every completed request and
//!   finally the summary. This is meant for live progress displays.
//!
//! Both take a [`CancellationToken`](tokio_util::sync::CancellationToken). Canceling it stops the
//! run after the requests currently in flight, which still yields a valid, partial summary.
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use volley_engine::Config;
//!
//! # async fn example() -> Result<(), volley_engine::EngineError> {
//! let config = Config {
//!     total: 1000,
//!     concurrency: 50,
//!     ..Config::new("http://localhost:8080/health")
//! };
//!
//! let summary = volley_engine::run(CancellationToken::new(), config).await?;
//! println!("{} responses, {} errors", summary.total_done, summary.errors);
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod aggregator;
pub mod config;
mod engine;
pub mod error;
pub mod event;
mod http;
mod jobs;
pub mod summary;
mod worker;

pub use crate::config::Config;
pub use crate::engine::{run, start};
pub use crate::error::{EngineError, RequestError};
pub use crate::event::{Event, EventStream, Outcome};
pub use crate::jobs::Job;
pub use crate::summary::{LatencyStats, StatusCount, Summary, requests_per_second};
