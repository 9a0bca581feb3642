//! Parameters of a load test run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-request timeout used when the configured timeout is zero.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP method used when no method is configured.
pub const DEFAULT_METHOD: &str = "GET";

/// Parameters of a single load test run.
///
/// A `Config` is handed to the engine by value and never changes during the run. Out-of-range
/// values are not rejected; see [`Config::normalized`] for how they are coerced.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Absolute URL every request is sent to.
    pub target: String,
    /// Number of requests to send in total.
    pub total: u64,
    /// Number of requests in flight at the same time.
    pub concurrency: usize,
    /// Timeout of a single request, from dispatch until the body has been read.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// HTTP method of every request, for example `GET` or `HEAD`.
    pub method: String,
}

impl Config {
    /// Creates a config that sends a single `GET` request to `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Applies the defaulting rules of the engine.
    ///
    /// - `total` and `concurrency` of zero become `1`.
    /// - A zero `timeout` becomes [`DEFAULT_TIMEOUT`].
    /// - An empty `method` becomes [`DEFAULT_METHOD`].
    pub fn normalized(mut self) -> Self {
        self.total = self.total.max(1);
        self.concurrency = self.concurrency.max(1);
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        if self.method.is_empty() {
            self.method = DEFAULT_METHOD.to_owned();
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: String::new(),
            total: 1,
            concurrency: 1,
            timeout: DEFAULT_TIMEOUT,
            method: DEFAULT_METHOD.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_zero_values() {
        let config = Config {
            target: "http://localhost".into(),
            total: 0,
            concurrency: 0,
            timeout: Duration::ZERO,
            method: String::new(),
        }
        .normalized();

        assert_eq!(config.total, 1);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.method, "GET");
    }

    #[test]
    fn keeps_valid_values() {
        let config = Config {
            target: "http://localhost".into(),
            total: 500,
            concurrency: 20,
            timeout: Duration::from_millis(250),
            method: "HEAD".into(),
        };

        assert_eq!(config.clone().normalized(), config);
    }

    #[test]
    fn deserializes_humantime_timeout() {
        let config: Config = serde_json::from_str(
            r#"{"target": "http://localhost:8080", "total": 10, "timeout": "2s 500ms"}"#,
        )
        .unwrap();

        assert_eq!(config.total, 10);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.method, "GET");
    }
}
