//! Exposes an in-process stub HTTP server for use in integration tests.
//!
//! ```
//! use volley_test::server::{Behavior, StubServer};
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = StubServer::new(Behavior::Fixed(204)).await;
//!    let url = server.url("/health");
//!    // point a load test at the URL...
//! }
//! ```

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Body returned with every response of the stub server.
pub const BODY: &str = "volley stub server";

/// How the stub server answers requests.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Answer every request with the given status code.
    Fixed(u16),
    /// Cycle through the given status codes, one per request.
    Rotating(Vec<u16>),
    /// Wait for the given duration, then answer with the status code.
    Delayed(u16, Duration),
    /// Accept connections and close them immediately without sending a response.
    DropConnection,
}

#[derive(Debug)]
struct StubState {
    behavior: Behavior,
    hits: Arc<AtomicUsize>,
}

/// An in-process stub server for use in integration tests.
///
/// The server listens on a random available port on localhost, accepts any method and path, and
/// answers according to its [`Behavior`]. It stops when dropped.
#[derive(Debug)]
pub struct StubServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    /// Starts a server that answers every request with `200 OK`.
    pub async fn ok() -> Self {
        Self::new(Behavior::Fixed(200)).await
    }

    /// Starts a server with the given behavior.
    pub async fn new(behavior: Behavior) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();
        let listener = tokio::net::TcpListener::from_std(listener).unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let handle = match behavior {
            Behavior::DropConnection => tokio::spawn(drop_connections(listener, hits.clone())),
            behavior => {
                let state = Arc::new(StubState {
                    behavior,
                    hits: hits.clone(),
                });
                let app = Router::new().fallback(respond).with_state(state);
                tokio::spawn(async move {
                    axum::serve(listener, app).await.unwrap();
                })
            }
        };

        Self {
            handle,
            socket,
            hits,
        }
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://{}/{}", self.socket, path)
    }

    /// Number of requests, or connections for [`Behavior::DropConnection`], received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(State(state): State<Arc<StubState>>) -> Response {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst);

    let code = match &state.behavior {
        Behavior::Fixed(code) => *code,
        Behavior::Rotating(codes) if codes.is_empty() => 200,
        Behavior::Rotating(codes) => codes[hit % codes.len()],
        Behavior::Delayed(code, delay) => {
            tokio::time::sleep(*delay).await;
            *code
        }
        Behavior::DropConnection => unreachable!("served without axum"),
    };

    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, BODY).into_response()
}

async fn drop_connections(listener: tokio::net::TcpListener, hits: Arc<AtomicUsize>) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            continue;
        };
        hits.fetch_add(1, Ordering::SeqCst);
        drop(stream);
    }
}
