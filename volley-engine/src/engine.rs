//! Run a load test against a single HTTP target and report its progress.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use reqwest::Url;
use sketches_ddsketch::DDSketch;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::error::EngineError;
use crate::event::{Event, EventStream};
use crate::http::HttpTarget;
use crate::jobs::JobSource;
use crate::summary::Summary;
use crate::worker::Worker;

/// Starts a load test in the background and returns its live event stream.
///
/// The stream begins with [`Event::Started`] and ends with exactly one [`Event::Finished`]. The
/// caller must drain the stream until it yields `None`; workers wait while its buffer is full.
/// Dropping the stream stops all workers after their current request.
///
/// Canceling `cancel` stops workers from taking new jobs. Requests already in flight still
/// complete, and the final summary covers the partial run.
///
/// If `config.target` is not an absolute URL, no request is sent and the run finishes
/// immediately with an all-zero [`Summary`].
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn start(cancel: CancellationToken, config: Config) -> EventStream {
    let (events, stream) = EventStream::channel();
    tokio::spawn(orchestrate(cancel, config, events));
    stream
}

/// Runs a load test to completion and returns its final summary.
///
/// This drains the event stream of [`start`] and discards all intermediate events. See there for
/// the semantics of cancellation and invalid targets.
pub async fn run(cancel: CancellationToken, config: Config) -> Result<Summary, EngineError> {
    let mut events = start(cancel, config);
    let mut summary = None;

    while let Some(event) = events.recv().await {
        match event {
            Event::Started => {}
            Event::RequestDone(_) => {}
            Event::Finished(finished) => summary = Some(finished),
        }
    }

    summary.ok_or(EngineError::Incomplete)
}

async fn orchestrate(cancel: CancellationToken, config: Config, events: mpsc::Sender<Event>) {
    // Send errors only mean that nobody listens anymore, the run is still completed.
    events.send(Event::Started).await.ok();
    let summary = execute(cancel, config, &events).await;
    events.send(Event::Finished(summary)).await.ok();
}

async fn execute(
    cancel: CancellationToken,
    config: Config,
    events: &mpsc::Sender<Event>,
) -> Summary {
    let url = match Url::parse(&config.target) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(
                error = &err as &dyn std::error::Error,
                url = %config.target,
                "invalid target URL, no requests sent"
            );
            return Summary::default();
        }
    };

    let config = config.normalized();
    let target = match HttpTarget::new(&config, url) {
        Ok(target) => Arc::new(target),
        Err(err) => {
            tracing::error!(
                error = &err as &dyn std::error::Error,
                "failed to create HTTP client, no requests sent"
            );
            return Summary::default();
        }
    };

    // Workers beyond the number of jobs could never take one.
    let concurrency = usize::try_from(config.total)
        .map_or(config.concurrency, |total| total.min(config.concurrency));

    tracing::info!(
        url = %config.target,
        total = config.total,
        concurrency,
        method = %config.method,
        timeout = ?config.timeout,
        "starting load test"
    );

    let jobs = Arc::new(JobSource::new(config.total));
    let aggregator = Arc::new(Aggregator::new());

    let started_at = SystemTime::now();
    let start = Instant::now();

    let workers: Vec<_> = (0..concurrency)
        .map(|id| {
            let worker = Worker {
                id,
                target: Arc::clone(&target),
                jobs: Arc::clone(&jobs),
                aggregator: Arc::clone(&aggregator),
                events: events.clone(),
                cancel: cancel.clone(),
            };
            tokio::spawn(worker.run())
        })
        .collect();

    // Wait for all workers before reading the counters.
    let mut latency = DDSketch::default();
    for result in futures::future::join_all(workers).await {
        match result {
            Ok(sketch) => {
                if let Err(err) = latency.merge(&sketch) {
                    tracing::warn!(error = %err, "failed to merge latencies");
                }
            }
            Err(err) => {
                tracing::error!(error = &err as &dyn std::error::Error, "worker panicked");
            }
        }
    }

    let ended_at = started_at + start.elapsed();
    let summary = aggregator.snapshot(&latency, started_at, ended_at);

    tracing::info!(
        total_done = summary.total_done,
        errors = summary.errors,
        canceled = cancel.is_cancelled(),
        elapsed = ?summary.elapsed(),
        "load test finished"
    );

    summary
}
