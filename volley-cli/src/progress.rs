//! Live progress display on stderr.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use volley_engine::{Event, Outcome, Summary};

/// Counters shown next to the progress bar while the run is going.
///
/// The number of completed requests is the position of the bar itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveStats {
    /// Responses per HTTP status code.
    pub statuses: BTreeMap<u16, u64>,
    /// Requests that obtained no response.
    pub errors: u64,
}

impl LiveStats {
    /// Accounts for a single finished request.
    pub fn record(&mut self, outcome: &Outcome) {
        if outcome.is_response() {
            *self.statuses.entry(outcome.status).or_default() += 1;
        } else {
            self.errors += 1;
        }
    }
}

impl fmt::Display for LiveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (code, count) in &self.statuses {
            write!(f, "{code}: {count}, ")?;
        }
        write!(f, "errors: {}", self.errors)
    }
}

/// Runs the load test while drawing a progress bar, and returns its summary.
pub async fn run_with_progress(
    cancel: CancellationToken,
    config: volley_engine::Config,
) -> Result<Summary> {
    let bar = ProgressBar::new(config.total)
        .with_style(ProgressStyle::with_template(
            "{spinner} {elapsed} {wide_bar} {pos}/{len} ({per_sec}) {msg}",
        )?)
        .with_message(LiveStats::default().to_string());
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut stats = LiveStats::default();
    let mut summary = None;

    let mut events = volley_engine::start(cancel, config);
    while let Some(event) = events.recv().await {
        match event {
            Event::Started => bar.reset_elapsed(),
            Event::RequestDone(outcome) => {
                stats.record(&outcome);
                bar.inc(1);
                bar.set_message(stats.to_string());
            }
            Event::Finished(finished) => summary = Some(finished),
        }
    }

    bar.finish_and_clear();
    Ok(summary.ok_or(volley_engine::EngineError::Incomplete)?)
}

#[cfg(test)]
mod tests {
    use volley_engine::RequestError;

    use super::*;

    #[test]
    fn live_stats() {
        let mut stats = LiveStats::default();
        assert_eq!(stats.to_string(), "errors: 0");

        stats.record(&Outcome::response(404, Duration::from_millis(3), 10));
        stats.record(&Outcome::response(200, Duration::from_millis(3), 10));
        stats.record(&Outcome::response(200, Duration::from_millis(3), 10));
        stats.record(&Outcome::failure(
            RequestError::Timeout,
            Duration::from_secs(1),
        ));

        assert_eq!(stats.statuses, BTreeMap::from([(200, 2), (404, 1)]));
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.to_string(), "200: 2, 404: 1, errors: 1");
    }
}
