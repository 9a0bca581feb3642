//! Configuration for the `volley` command line tool.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Command line flags
//! 2. Environment variables (prefixed with `VOLLEY__`)
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `VOLLEY__` as a prefix and double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `VOLLEY__URL=http://localhost:8080/` sets the target URL
//! - `VOLLEY__REQUESTS=10000` sets the total number of requests
//! - `VOLLEY__LOGGING__LEVEL=debug` sets the log level
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! url: http://localhost:8080/
//! requests: 10000
//!
//! logging:
//!   level: debug
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "VOLLEY__";

/// Output format of the final report.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable report, colored when printed to a terminal.
    #[default]
    Text,
    /// A single JSON document.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("text") => Ok(OutputFormat::Text),
            s if s.eq_ignore_ascii_case("json") => Ok(OutputFormat::Json),
            s => Err(FormatParseError {
                value: s.into(),
                expected: r#""text", "json""#,
            }),
        }
    }
}

/// The log output format.
///
/// Used in: [`Logging::format`]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    #[default]
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output, without timestamps.
    Simplified,

    /// Dump out JSON lines.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => {
                return Err(FormatParseError {
                    value: s.into(),
                    expected: r#""auto", "pretty", "simplified", "json""#,
                });
            }
        };

        Ok(result)
    }
}

/// Error returned when parsing an [`OutputFormat`] or [`LogFormat`] fails.
#[derive(Clone, Debug)]
pub struct FormatParseError {
    value: String,
    expected: &'static str,
}

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of {}"#,
            self.value, self.expected
        )
    }
}

impl std::error::Error for FormatParseError {}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr, so they never mix with the report on stdout.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// Controls which log messages are emitted. Valid values are `off`, `error`, `warn`, `info`,
    /// `debug` and `trace`. The `RUST_LOG` environment variable takes precedence when set.
    ///
    /// # Default
    ///
    /// `warn`
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format.
    ///
    /// # Default
    ///
    /// `auto`
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__LOGGING__FORMAT`
    #[serde(with = "display_fromstr")]
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            format: LogFormat::Auto,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Auto => "auto",
            LogFormat::Pretty => "pretty",
            LogFormat::Simplified => "simplified",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Main configuration struct for the `volley` command line tool.
///
/// This is the top-level configuration combining all settings of a load test run. Every field
/// can also be set from the command line, which takes precedence over all other sources.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// URL of the endpoint under test.
    ///
    /// Required. Must be an absolute URL, for example `http://localhost:8080/health`.
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__URL`
    pub url: String,

    /// Total number of requests to send.
    ///
    /// # Default
    ///
    /// `100`
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__REQUESTS`
    pub requests: u64,

    /// Number of requests in flight at the same time.
    ///
    /// # Default
    ///
    /// `10`
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__CONCURRENCY`
    pub concurrency: usize,

    /// Timeout of a single request.
    ///
    /// # Default
    ///
    /// `30s`
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__TIMEOUT`
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// HTTP method of every request.
    ///
    /// # Default
    ///
    /// `GET`
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__METHOD`
    pub method: String,

    /// Shows a live progress bar on stderr while the test runs.
    ///
    /// # Default
    ///
    /// `false`
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__PROGRESS`
    pub progress: bool,

    /// Format of the final report printed to stdout.
    ///
    /// # Default
    ///
    /// `text`
    ///
    /// # Environment Variable
    ///
    /// `VOLLEY__FORMAT`
    pub format: OutputFormat,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            requests: 100,
            concurrency: 10,
            timeout: Duration::from_secs(30),
            method: "GET".to_owned(),
            progress: false,
            format: OutputFormat::Text,
            logging: Logging::default(),
        }
    }
}

/// Values given explicitly on the command line.
///
/// Unset fields leave the value from lower-precedence sources untouched.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde::option"
    )]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Loads the configuration from all sources, see the [module documentation](self).
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        Ok(config)
    }

    /// Checks the values the engine would otherwise silently coerce.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!("a target URL is required, pass it with --url");
        }
        if self.requests == 0 {
            anyhow::bail!("the number of requests must be greater than zero");
        }
        if self.concurrency == 0 {
            anyhow::bail!("the concurrency must be greater than zero");
        }
        Ok(())
    }

    /// Returns the parameters of the load test run.
    pub fn engine_config(&self) -> volley_engine::Config {
        volley_engine::Config {
            target: self.url.clone(),
            total: self.requests,
            concurrency: self.concurrency,
            timeout: self.timeout,
            method: self.method.clone(),
        }
    }
}
