//! In-process backend for integration testing.
//!
//! Serves an axum router on an ephemeral localhost port so tests exercise the
//! real HTTP path, including chunked streaming bodies.

use std::convert::Infallible;
use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use futures::stream::{self, StreamExt};
use novel_client::NovelClient;
use tokio::task::JoinHandle;

/// A running test backend. Shut down on drop.
pub struct TestServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn(router: Router) -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test listener")?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            handle,
        })
    }

    /// Client with an overall request timeout so a hung stream fails the test.
    pub fn client(&self) -> NovelClient {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build test HTTP client");
        NovelClient::new(&self.base_url).with_http_client(http_client)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn event_stream_response(body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// Stream `chunks` with a short pause between each so they arrive separately.
pub fn chunked_events(chunks: Vec<Vec<u8>>) -> Response {
    let body = stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok::<_, Infallible>(chunk)
    });
    event_stream_response(Body::from_stream(body))
}

/// Stream `chunks`, then abort the connection mid-body.
///
/// Each step waits first so headers and data are flushed before the abort.
pub fn aborted_events(chunks: Vec<Vec<u8>>) -> Response {
    let body = stream::iter(chunks.into_iter().map(Ok::<_, io::Error>))
        .chain(stream::once(async {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "backend crashed"))
        }))
        .then(|item| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            item
        });
    event_stream_response(Body::from_stream(body))
}

/// Stream `chunks`, then hold the connection open forever.
pub fn stalled_events(chunks: Vec<Vec<u8>>) -> Response {
    let body = stream::iter(chunks.into_iter().map(Ok::<_, Infallible>))
        .chain(stream::pending::<Result<Vec<u8>, Infallible>>());
    event_stream_response(Body::from_stream(body))
}

/// JSON envelope with `success: true`.
pub fn ok_envelope(data: serde_json::Value) -> Response {
    Json(serde_json::json!({ "success": true, "data": data })).into_response()
}

/// JSON envelope with `success: false` and the given status.
pub fn failed_envelope(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "success": false, "message": message })),
    )
        .into_response()
}

/// Split `bytes` into pieces of `size` bytes (the last may be shorter).
pub fn split_every(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}
