//! Rendering of the final summary.

use std::fmt;
use std::time::Duration;

use bytesize::ByteSize;
use serde::Serialize;
use volley_engine::{LatencyStats, Summary};
use yansi::Paint;

use crate::config::Config;

/// Renders the human readable report.
pub fn render_text(config: &Config, summary: &Summary) -> String {
    TextReport { config, summary }.to_string()
}

struct TextReport<'a> {
    config: &'a Config,
    summary: &'a Summary,
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { config, summary } = *self;
        writeln!(
            out,
            "{} {} {}",
            "## Load test".bold(),
            config.method.bold(),
            config.url.bold().blue()
        )?;
        writeln!(
            out,
            "  requests: {}; concurrency: {}; elapsed: {:.2?}",
            config.requests.bold(),
            config.concurrency.bold(),
            summary.elapsed().bold()
        )?;
        writeln!(out)?;

        write!(
            out,
            "{} ({} responses, {} HTTP 200",
            "RESPONSES:".bold().green(),
            summary.total_done.bold(),
            summary.status_200.bold()
        )?;
        if summary.errors > 0 {
            write!(
                out,
                ", {}",
                format!("{} ERRORS", summary.errors).bold().red()
            )?;
        }
        writeln!(out, ")")?;

        for status in summary.status_distribution_sorted() {
            // Failed requests never carry a status code.
            if status.code == 0 {
                continue;
            }
            let code = status.code.to_string();
            let code = if (200..300).contains(&status.code) {
                code.green()
            } else if status.code >= 500 {
                code.red()
            } else {
                code.yellow()
            };
            writeln!(out, "  {code}: {}", status.count)?;
        }

        if summary.latency.count > 0 {
            write_latency(out, &summary.latency)?;
        }

        let elapsed = summary.elapsed();
        let throughput = per_second(summary.bytes_received, elapsed);
        writeln!(
            out,
            "  {:.2} requests/s, {} received ({}/s)",
            summary.requests_per_second().bold(),
            ByteSize::b(summary.bytes_received).bold(),
            ByteSize::b(throughput)
        )?;

        Ok(())
    }
}

fn write_latency(out: &mut fmt::Formatter<'_>, latency: &LatencyStats) -> fmt::Result {
    writeln!(
        out,
        "  avg: {:.2?}; p50: {:.2?}; p90: {:.2?}; p99: {:.2?}",
        latency.avg.bold(),
        latency.p50,
        latency.p90,
        latency.p99
    )?;
    writeln!(out, "  min: {:.2?}; max: {:.2?}", latency.min, latency.max)
}

fn per_second(total: u64, elapsed: Duration) -> u64 {
    let rate = volley_engine::requests_per_second(total, elapsed);
    rate as u64
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    url: &'a str,
    method: &'a str,
    requests: u64,
    concurrency: usize,
    #[serde(with = "humantime_serde")]
    elapsed: Duration,
    requests_per_second: f64,
    #[serde(flatten)]
    summary: &'a Summary,
}

/// Renders the report as a pretty printed JSON document.
pub fn render_json(config: &Config, summary: &Summary) -> serde_json::Result<String> {
    let report = JsonReport {
        url: &config.url,
        method: &config.method,
        requests: config.requests,
        concurrency: config.concurrency,
        elapsed: summary.elapsed(),
        requests_per_second: summary.requests_per_second(),
        summary,
    };
    serde_json::to_string_pretty(&report)
}
