use std::sync::Arc;

use sketches_ddsketch::DDSketch;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::event::Event;
use crate::http::HttpTarget;
use crate::jobs::JobSource;

/// A single execution unit of the worker pool.
///
/// Workers take jobs until the source is exhausted or the run is canceled, and send one request
/// per job. Failed requests are recorded like any other outcome and never stop a worker.
#[derive(Debug)]
pub(crate) struct Worker {
    pub id: usize,
    pub target: Arc<HttpTarget>,
    pub jobs: Arc<JobSource>,
    pub aggregator: Arc<Aggregator>,
    pub events: mpsc::Sender<Event>,
    pub cancel: CancellationToken,
}

impl Worker {
    /// Runs the worker to completion and returns the latencies of all obtained responses.
    pub async fn run(self) -> DDSketch {
        let mut latency = DDSketch::default();

        loop {
            // Cancellation is only observed between requests. An in-flight request always runs
            // until it completes or times out.
            if self.cancel.is_cancelled() {
                tracing::debug!(
                    worker = self.id,
                    remaining = self.jobs.remaining(),
                    "worker canceled"
                );
                break;
            }

            let Some(job) = self.jobs.next_job() else {
                break;
            };

            let outcome = self.target.send().await;
            tracing::trace!(
                worker = self.id,
                %job,
                status = outcome.status,
                latency = ?outcome.latency,
                error = outcome.error.as_ref().map(tracing::field::display),
                "request done"
            );

            if outcome.is_response() {
                latency.add(outcome.latency.as_secs_f64());
            }
            self.aggregator.record(&outcome);

            if self.events.send(Event::RequestDone(outcome)).await.is_err() {
                tracing::debug!(worker = self.id, "event stream dropped, stopping worker");
                break;
            }
        }

        tracing::debug!(worker = self.id, "worker finished");
        latency
    }
}
