//! Lock-free accumulation of request outcomes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;
use sketches_ddsketch::DDSketch;

use crate::event::Outcome;
use crate::summary::{LatencyStats, Summary};

/// Counters shared by all workers of a run.
///
/// Every update is a single atomic operation. Per-status counters are created on first use and
/// incremented atomically afterwards, so concurrent writers never wait on each other unless they
/// insert the same status code for the first time.
#[derive(Debug, Default)]
pub(crate) struct Aggregator {
    total_done: AtomicU64,
    status_200: AtomicU64,
    errors: AtomicU64,
    bytes_received: AtomicU64,
    status_map: DashMap<u16, AtomicU64>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for a single outcome.
    pub fn record(&self, outcome: &Outcome) {
        if !outcome.is_response() {
            self.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.total_done.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(outcome.bytes, Ordering::Relaxed);
        if outcome.status == 200 {
            self.status_200.fetch_add(1, Ordering::Relaxed);
        }
        self.increment_status(outcome.status);
    }

    fn increment_status(&self, code: u16) {
        // Fast path: the counter exists and only a shared lock on its shard is needed.
        if let Some(counter) = self.status_map.get(&code) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.status_map
            .entry(code)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters into a [`Summary`].
    ///
    /// The result is only consistent once no worker records outcomes anymore.
    pub fn snapshot(
        &self,
        latency: &DDSketch,
        started_at: SystemTime,
        ended_at: SystemTime,
    ) -> Summary {
        let status_map = self
            .status_map
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect();

        Summary {
            total_done: self.total_done.load(Ordering::Relaxed),
            status_200: self.status_200.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            status_map,
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            latency: LatencyStats::from_sketch(latency),
            started_at,
            ended_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::RequestError;

    fn snapshot(aggregator: &Aggregator) -> Summary {
        let now = SystemTime::now();
        aggregator.snapshot(&DDSketch::default(), now, now)
    }

    #[test]
    fn counts_responses_and_errors() {
        let aggregator = Aggregator::new();
        let latency = Duration::from_millis(3);

        aggregator.record(&Outcome::response(200, latency, 10));
        aggregator.record(&Outcome::response(200, latency, 10));
        aggregator.record(&Outcome::response(404, latency, 5));
        aggregator.record(&Outcome::failure(RequestError::Timeout, latency));

        let summary = snapshot(&aggregator);
        assert_eq!(summary.total_done, 3);
        assert_eq!(summary.status_200, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.bytes_received, 25);
        assert_eq!(summary.status_map, BTreeMap::from([(200, 2), (404, 1)]));
    }

    #[test]
    fn errors_never_enter_status_map() {
        let aggregator = Aggregator::new();
        aggregator.record(&Outcome::failure(
            RequestError::Connect("refused".into()),
            Duration::ZERO,
        ));

        let summary = snapshot(&aggregator);
        assert_eq!(summary.total_done, 0);
        assert_eq!(summary.errors, 1);
        assert!(summary.status_map.is_empty());
    }

    #[test]
    fn concurrent_writers() {
        let aggregator = Arc::new(Aggregator::new());
        let codes = [200, 201, 404, 500];

        let handles: Vec<_> = (0..8)
            .map(|thread| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        let code = codes[(thread + i) % codes.len()];
                        aggregator.record(&Outcome::response(code, Duration::ZERO, 0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = snapshot(&aggregator);
        assert_eq!(summary.total_done, 8000);
        assert_eq!(summary.status_map.values().sum::<u64>(), 8000);
        assert_eq!(summary.status_map.len(), 4);
        assert_eq!(summary.status_200, summary.status_map[&200]);
    }
}
