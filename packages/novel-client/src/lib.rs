//! Streaming search client for the Z Reader novel backend.
//!
//! A search fans out to every configured source on the backend; results come
//! back as a chunked event stream while sources answer out of order. This crate
//! decodes that stream, folds it into a running view of found books and
//! progress, and renders a report after every event. Plain request/response
//! endpoints (source registry, download tasks, files) are wrapped as well.
//!
//! # Example
//!
//! ```rust,ignore
//! use novel_client::{NovelClient, ProgressReport, AggregationState, SearchRequest};
//!
//! let client = NovelClient::from_env()?;
//!
//! let mut render = |report: &ProgressReport, _state: &AggregationState| {
//!     println!("[{:>3}%] {}", report.percent(), report.status_line.as_deref().unwrap_or(""));
//! };
//! let outcome = client.search(&SearchRequest::new("斗破苍穹"), &mut render).await?;
//!
//! for book in outcome.books() {
//!     println!("{} - {} ({})", book.book_name, book.author, book.source_name);
//! }
//! ```

pub mod aggregator;
pub mod decoder;
pub mod error;
pub mod reporter;
pub mod search;
pub mod session;
pub mod streaming;
pub mod types;
pub mod util;

pub use aggregator::{
    AggregationState, SearchAggregator, SourceActivity, SourceOutcome, Terminal, Transition,
};
pub use decoder::EventFrameDecoder;
pub use error::{
    DecodeError, NovelError, ProtocolError, Result, SearchError, SessionError, TransportError,
};
pub use reporter::{ProgressReport, RenderTarget, ReportPhase};
pub use search::{consume, consume_until_cancelled, SearchOutcome};
pub use session::{SearchTicket, Session, Tab};
pub use streaming::SearchEventStream;
pub use types::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Client for the novel backend.
#[derive(Clone)]
pub struct NovelClient {
    http_client: Client,
    base_url: String,
}

impl NovelClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from environment variable `NOVEL_API_URL`, falling back to [`DEFAULT_BASE_URL`].
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("NOVEL_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url)
            .map_err(|e| NovelError::Config(format!("NOVEL_API_URL is not a valid URL: {}", e)))?;
        Ok(Self::new(base_url))
    }

    /// Use a preconfigured `reqwest` client (proxies, custom TLS, etc.).
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Bound connection setup. Streams themselves have no overall timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| NovelError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Open the search event stream.
    ///
    /// Fails before streaming starts if the keyword is blank or the backend
    /// rejects the request.
    pub async fn search_stream(&self, request: &SearchRequest) -> Result<SearchEventStream> {
        if request.keyword.trim().is_empty() {
            return Err(NovelError::InvalidInput("search keyword is empty".into()));
        }

        let response = self
            .http_client
            .post(self.endpoint(&["api", "search", "stream"])?)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Search stream request failed");
                NovelError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        info!(keyword = %request.keyword, source_id = ?request.source_id, "Search stream opened");
        Ok(SearchEventStream::new(response.bytes_stream()))
    }

    /// Run a streaming search to the end, rendering after every event.
    pub async fn search<R>(&self, request: &SearchRequest, render: &mut R) -> Result<SearchOutcome>
    where
        R: RenderTarget + ?Sized,
    {
        let events = self.search_stream(request).await?;
        Ok(consume(events, render).await)
    }

    /// Run a streaming search until it ends or `cancel` fires.
    pub async fn search_until_cancelled<R>(
        &self,
        request: &SearchRequest,
        render: &mut R,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome>
    where
        R: RenderTarget + ?Sized,
    {
        let events = self.search_stream(request).await?;
        Ok(consume_until_cancelled(events, render, cancel).await)
    }

    /// One-shot search without progress, for hosts that cannot consume streams.
    pub async fn search_once(&self, request: &SearchRequest) -> Result<Vec<BookSummary>> {
        if request.keyword.trim().is_empty() {
            return Err(NovelError::InvalidInput("search keyword is empty".into()));
        }

        let response = self
            .http_client
            .post(self.endpoint(&["api", "search"])?)
            .json(request)
            .send()
            .await?;
        let books: Vec<BookSummary> = into_data(read_envelope(response).await?)?;

        debug!(keyword = %request.keyword, books = books.len(), "One-shot search");
        Ok(books)
    }

    // =========================================================================
    // Sources
    // =========================================================================

    /// List configured sources.
    pub async fn list_sources(&self) -> Result<Vec<SourceInfo>> {
        let response = self
            .http_client
            .get(self.endpoint(&["api", "sources"])?)
            .send()
            .await?;
        into_data(read_envelope(response).await?)
    }

    /// Run a test search against every source. Slow: the backend queries each one.
    pub async fn check_sources(&self) -> Result<SourceCheckReport> {
        let response = self
            .http_client
            .post(self.endpoint(&["api", "sources", "check"])?)
            .send()
            .await?;
        let envelope: ApiEnvelope<Vec<SourceCheck>> = read_envelope(response).await?;

        let summary = envelope.summary.unwrap_or_default();
        let sources = into_data(envelope)?;
        info!(
            total = summary.total,
            success = summary.success,
            error = summary.error,
            "Source check finished"
        );
        Ok(SourceCheckReport { sources, summary })
    }

    // =========================================================================
    // Download tasks
    // =========================================================================

    /// Queue a background download. Returns the task id.
    pub async fn start_download(&self, request: &DownloadRequest) -> Result<String> {
        if request.book_url.trim().is_empty() {
            return Err(NovelError::InvalidInput("book URL is empty".into()));
        }

        let response = self
            .http_client
            .post(self.endpoint(&["api", "download"])?)
            .json(request)
            .send()
            .await?;
        let created: TaskCreated = into_data(read_envelope(response).await?)?;

        info!(task_id = %created.task_id, book_url = %request.book_url, "Download task created");
        Ok(created.task_id)
    }

    /// List download tasks, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<DownloadTask>> {
        let response = self
            .http_client
            .get(self.endpoint(&["api", "tasks"])?)
            .send()
            .await?;
        let mut tasks: Vec<DownloadTask> = into_data(read_envelope(response).await?)?;
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<DownloadTask> {
        let response = self
            .http_client
            .get(self.endpoint(&["api", "tasks", task_id])?)
            .send()
            .await?;
        into_data(read_envelope(response).await?)
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.endpoint(&["api", "tasks", task_id])?)
            .send()
            .await?;
        let _: ApiEnvelope<serde_json::Value> = read_envelope(response).await?;

        debug!(task_id, "Download task deleted");
        Ok(())
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// List finished files, most recently modified first.
    pub async fn list_files(&self) -> Result<Vec<DownloadedFile>> {
        let response = self
            .http_client
            .get(self.endpoint(&["api", "files"])?)
            .send()
            .await?;
        into_data(read_envelope(response).await?)
    }

    /// Stream a finished file into `dest_dir`, returning the written path.
    pub async fn download_file(&self, name: &str, dest_dir: &Path) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(NovelError::InvalidInput(format!("invalid file name: {:?}", name)));
        }

        let response = self
            .http_client
            .get(self.endpoint(&["api", "files", name])?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(name);
        let mut file = tokio::fs::File::create(&path).await?;

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(file = %path.display(), bytes = written, "File downloaded");
        Ok(path)
    }

    // =========================================================================
    // Reader
    // =========================================================================

    /// Web reader page for a search result.
    ///
    /// The book URL travels as a single encoded path segment, so its own
    /// slashes and query string survive the round trip.
    pub fn reader_url(&self, book: &BookSummary) -> Result<Url> {
        if book.url.trim().is_empty() {
            return Err(NovelError::InvalidInput("book URL is empty".into()));
        }
        let source_id = book.source_id.to_string();
        self.endpoint(&["reader", &source_id, &book.url])
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| NovelError::Config(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| NovelError::Config(format!("Base URL cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Turn a non-2xx response into an API error, preferring the envelope's message.
async fn api_error(response: Response) -> NovelError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or(body);

    warn!(status = %status, error = %message, "Novel API error");
    NovelError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Read a JSON envelope, mapping HTTP and `success: false` failures to errors.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<ApiEnvelope<T>> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(response).await);
    }

    let envelope: ApiEnvelope<T> = response
        .json()
        .await
        .map_err(|e| NovelError::Parse(format!("Failed to parse response: {}", e)))?;

    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| "request failed".to_string());
        warn!(status = %status, error = %message, "Novel API reported failure");
        return Err(NovelError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(envelope)
}

fn into_data<T>(envelope: ApiEnvelope<T>) -> Result<T> {
    envelope
        .data
        .ok_or_else(|| NovelError::Parse("response has no data".into()))
}
