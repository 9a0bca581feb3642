//! Error types of the load generation engine.

use thiserror::Error;

/// Errors returned by the blocking entry point [`run`](crate::run).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The event stream closed without delivering a final summary.
    #[error("load test did not complete: event stream closed before the final summary")]
    Incomplete,
}

/// Why a single request did not obtain an HTTP response.
///
/// Failures are recorded as data on the [`Outcome`](crate::Outcome) of a request and never abort
/// the run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// The request could not be constructed, for instance because of an invalid method.
    #[error("invalid request: {0}")]
    Build(String),

    /// The request exceeded the configured per-request timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure, such as DNS resolution or a refused TCP connection.
    #[error("connection error: {0}")]
    Connect(String),

    /// Any other transport failure, such as the peer closing the connection mid-request.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RequestError {
    /// Returns the error category as a static string for classification in reports and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Build(_) => "build",
            Self::Timeout => "timeout",
            Self::Connect(_) => "connect",
            Self::Transport(_) => "transport",
        }
    }

    /// Classifies a [`reqwest::Error`] into the matching variant.
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::Build(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
