//! The final statistics of a load test run.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use sketches_ddsketch::DDSketch;

/// Statistics of a finished or canceled run.
///
/// A summary is produced exactly once per run, after all workers have stopped, and carried by
/// [`Event::Finished`](crate::Event::Finished). The following always holds:
///
/// - The values of `status_map` add up to `total_done`.
/// - `total_done + errors` is at most the configured total. It is smaller when the run was
///   canceled.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    /// Requests that obtained an HTTP response, regardless of its status code.
    pub total_done: u64,
    /// Requests answered with `200 OK`.
    pub status_200: u64,
    /// Requests that failed before obtaining any HTTP response.
    pub errors: u64,
    /// Number of responses per HTTP status code.
    pub status_map: BTreeMap<u16, u64>,
    /// Total number of response body bytes read.
    pub bytes_received: u64,
    /// Latency distribution of requests that obtained a response.
    pub latency: LatencyStats,
    /// When the workers were started.
    #[serde(with = "humantime_serde")]
    pub started_at: SystemTime,
    /// When the last worker stopped.
    #[serde(with = "humantime_serde")]
    pub ended_at: SystemTime,
}

impl Summary {
    /// Wall-clock time between start and end of the run.
    pub fn elapsed(&self) -> Duration {
        self.ended_at
            .duration_since(self.started_at)
            .unwrap_or_default()
    }

    /// Average number of responses per second over the whole run.
    pub fn requests_per_second(&self) -> f64 {
        requests_per_second(self.total_done, self.elapsed())
    }

    /// Returns the status code distribution ordered by ascending status code.
    pub fn status_distribution_sorted(&self) -> Vec<StatusCount> {
        // BTreeMap iterates in key order already.
        self.status_map
            .iter()
            .map(|(&code, &count)| StatusCount { code, count })
            .collect()
    }
}

impl Default for Summary {
    /// The all-zero summary of a run that never sent a request.
    fn default() -> Self {
        Self {
            total_done: 0,
            status_200: 0,
            errors: 0,
            status_map: BTreeMap::new(),
            bytes_received: 0,
            latency: LatencyStats::default(),
            started_at: SystemTime::UNIX_EPOCH,
            ended_at: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Number of responses observed for a single HTTP status code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct StatusCount {
    /// The HTTP status code.
    pub code: u16,
    /// How many responses carried this code.
    pub count: u64,
}

/// Latency percentiles, computed from a [`DDSketch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    /// Number of samples.
    pub count: u64,
    /// Fastest response.
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    /// Mean response time.
    #[serde(with = "humantime_serde")]
    pub avg: Duration,
    /// Median response time.
    #[serde(with = "humantime_serde")]
    pub p50: Duration,
    /// 90th percentile.
    #[serde(with = "humantime_serde")]
    pub p90: Duration,
    /// 99th percentile.
    #[serde(with = "humantime_serde")]
    pub p99: Duration,
    /// Slowest response.
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl LatencyStats {
    /// Computes the statistics of a sketch holding latencies in seconds.
    pub fn from_sketch(sketch: &DDSketch) -> Self {
        let count = sketch.count();
        if count == 0 {
            return Self::default();
        }

        let quantile = |q| {
            let secs = sketch.quantile(q).ok().flatten().unwrap_or_default();
            to_duration(secs)
        };

        Self {
            count: count as u64,
            min: to_duration(sketch.min().unwrap_or_default()),
            avg: to_duration(sketch.sum().unwrap_or_default() / count as f64),
            p50: quantile(0.5),
            p90: quantile(0.9),
            p99: quantile(0.99),
            max: to_duration(sketch.max().unwrap_or_default()),
        }
    }
}

fn to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_default()
}

/// Computes a rate of `count` per second of `elapsed`.
///
/// Returns `0.0` instead of a non-finite value, in particular when `elapsed` is zero.
pub fn requests_per_second(count: u64, elapsed: Duration) -> f64 {
    let rate = count as f64 / elapsed.as_secs_f64();
    if rate.is_finite() { rate } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rps_zero_elapsed() {
        assert_eq!(requests_per_second(100, Duration::ZERO), 0.0);
        assert_eq!(requests_per_second(0, Duration::ZERO), 0.0);
    }

    #[test]
    fn rps_regular() {
        let rps = requests_per_second(300, Duration::from_millis(1500));
        assert!((rps - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_summary_is_empty() {
        let summary = Summary::default();
        assert_eq!(summary.total_done, 0);
        assert_eq!(summary.errors, 0);
        assert!(summary.status_map.is_empty());
        assert_eq!(summary.elapsed(), Duration::ZERO);
        assert_eq!(summary.requests_per_second(), 0.0);
    }

    #[test]
    fn sorted_distribution() {
        let summary = Summary {
            total_done: 6,
            status_map: BTreeMap::from([(503, 1), (200, 3), (404, 2)]),
            ..Default::default()
        };

        let codes: Vec<_> = summary
            .status_distribution_sorted()
            .into_iter()
            .map(|sc| (sc.code, sc.count))
            .collect();
        assert_eq!(codes, [(200, 3), (404, 2), (503, 1)]);
    }

    #[test]
    fn elapsed_clock_skew() {
        let now = SystemTime::now();
        let summary = Summary {
            started_at: now,
            ended_at: now - Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(summary.elapsed(), Duration::ZERO);
    }

    #[test]
    fn latency_from_sketch() {
        let mut sketch = DDSketch::default();
        for ms in 1..=100 {
            sketch.add(ms as f64 / 1000.0);
        }

        let stats = LatencyStats::from_sketch(&sketch);
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min, Duration::from_millis(1));
        assert_eq!(stats.max, Duration::from_millis(100));
        // DDSketch guarantees a relative error of 1% by default.
        let p50 = stats.p50.as_secs_f64();
        assert!((0.049..=0.052).contains(&p50), "p50 = {p50}");
        assert!(stats.p99 >= stats.p90 && stats.p90 >= stats.p50);
    }

    #[test]
    fn latency_from_empty_sketch() {
        let stats = LatencyStats::from_sketch(&DDSketch::default());
        assert_eq!(stats, LatencyStats::default());
    }
}
