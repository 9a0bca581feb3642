//! Events emitted by a running load test.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;

use crate::error::RequestError;
use crate::summary::Summary;

/// Capacity of the event channel. Producers wait while it is full.
pub const EVENT_BUFFER: usize = 1024;

/// A lifecycle or progress event of a run.
///
/// Every run produces exactly one [`Started`](Event::Started), followed by any number of
/// [`RequestDone`](Event::RequestDone) in arbitrary order, followed by exactly one
/// [`Finished`](Event::Finished).
#[derive(Clone, Debug)]
pub enum Event {
    /// The run has started.
    Started,
    /// A single request has completed or failed.
    RequestDone(Outcome),
    /// The run is over. No more events follow.
    Finished(Summary),
}

/// The result of executing a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// The HTTP status code, or `0` if no response was obtained.
    pub status: u16,
    /// Time from dispatching the request until the response headers arrived.
    pub latency: Duration,
    /// Number of response body bytes read.
    pub bytes: u64,
    /// The reason no response was obtained, if any.
    pub error: Option<RequestError>,
}

impl Outcome {
    /// Creates the outcome of a request that obtained a response.
    pub fn response(status: u16, latency: Duration, bytes: u64) -> Self {
        Self {
            status,
            latency,
            bytes,
            error: None,
        }
    }

    /// Creates the outcome of a request that failed before obtaining a response.
    pub fn failure(error: RequestError, latency: Duration) -> Self {
        Self {
            status: 0,
            latency,
            bytes: 0,
            error: Some(error),
        }
    }

    /// Returns `true` if the request obtained an HTTP response.
    pub fn is_response(&self) -> bool {
        self.error.is_none()
    }
}

/// The live event feed of a run, returned by [`start`](crate::start).
///
/// The stream yields `None` once [`Event::Finished`] has been delivered. The consumer is expected
/// to keep draining it: workers block while the internal buffer is full.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    pub(crate) fn channel() -> (mpsc::Sender<Event>, Self) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (tx, Self { rx })
    }

    /// Receives the next event, or `None` after the run has finished.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
