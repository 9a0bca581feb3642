//! Issues the HTTP requests of a run against the target.

use std::time::{Duration, Instant};

use reqwest::{Client, Method, Url};

use crate::config::Config;
use crate::error::RequestError;
use crate::event::Outcome;

/// Timeout for establishing a connection, including the TLS handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval of TCP keep-alive probes on idle connections.
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// How long an unused connection stays in the pool.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

const USER_AGENT: &str = concat!("volley/", env!("CARGO_PKG_VERSION"));

/// The target of a run, together with the connection pool used to reach it.
///
/// A single `HttpTarget` is shared by all workers of a run and dropped together with its pool
/// when the run ends.
#[derive(Debug)]
pub struct HttpTarget {
    client: Client,
    url: Url,
    method: Result<Method, RequestError>,
}

impl HttpTarget {
    /// Creates the target for a normalized config and an already parsed URL.
    ///
    /// The idle pool holds up to twice `concurrency` connections, so that every worker finds a
    /// connection to reuse.
    pub fn new(config: &Config, url: Url) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(config.concurrency.saturating_mul(2))
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        // An invalid method fails every request, but does not prevent the run.
        let method = Method::from_bytes(config.method.as_bytes())
            .map_err(|err| RequestError::Build(format!("{err} `{}`", config.method)));

        Ok(Self {
            client,
            url,
            method,
        })
    }

    /// Sends a single request and reads the complete response.
    ///
    /// The latency covers dispatch until the response headers arrive. The body is drained
    /// afterwards, so that the connection can return to the pool.
    pub async fn send(&self) -> Outcome {
        let method = match &self.method {
            Ok(method) => method.clone(),
            Err(err) => return Outcome::failure(err.clone(), Duration::ZERO),
        };

        let request = match self.client.request(method, self.url.clone()).build() {
            Ok(request) => request,
            Err(err) => return Outcome::failure(RequestError::classify(&err), Duration::ZERO),
        };

        let start = Instant::now();
        let result = self.client.execute(request).await;
        let latency = start.elapsed();

        let mut response = match result {
            Ok(response) => response,
            Err(err) => return Outcome::failure(RequestError::classify(&err), latency),
        };

        let status = response.status().as_u16();
        let mut bytes = 0;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => bytes += chunk.len() as u64,
                Ok(None) => break,
                Err(err) => {
                    // The status has been obtained, so the request still counts as a response.
                    tracing::debug!(
                        error = &err as &dyn std::error::Error,
                        status,
                        "failed to drain response body"
                    );
                    break;
                }
            }
        }

        Outcome::response(status, latency, bytes)
    }
}
