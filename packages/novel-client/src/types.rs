//! Backend request and response types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// =============================================================================
// Books
// =============================================================================

/// One book found by one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    /// Book title
    pub book_name: String,

    /// Author as scraped by the source
    #[serde(default)]
    pub author: String,

    /// 1-based source identifier (index into the backend's rule list)
    pub source_id: u32,

    /// Source display name
    pub source_name: String,

    /// Canonical book URL, used as the download/read key
    pub url: String,

    #[serde(default)]
    pub category: Option<String>,

    /// Serialization status as reported by the source (e.g. "连载")
    #[serde(default)]
    pub status: Option<String>,

    /// Free-text word count as scraped (e.g. "12.3万字")
    #[serde(default)]
    pub word_count: Option<String>,

    #[serde(default)]
    pub latest_chapter: Option<String>,
}

// =============================================================================
// Search
// =============================================================================

/// Search request body, shared by the streaming and the one-shot endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub keyword: String,

    /// `None` searches every enabled source.
    pub source_id: Option<u32>,
}

impl SearchRequest {
    /// Search all enabled sources for `keyword`.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            source_id: None,
        }
    }

    /// Restrict the search to a single source.
    pub fn source(mut self, source_id: u32) -> Self {
        self.source_id = Some(source_id);
        self
    }
}

/// A decoded stream record.
///
/// A well-formed stream is exactly one `Start`, then any interleaving of
/// `SourceSearching` / `SourceResult` / `SourceError`, then exactly one of
/// `Complete` or `Fatal`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "start")]
    Start {
        #[serde(rename = "total")]
        total_sources: u32,
        keyword: String,
    },

    #[serde(rename = "searching")]
    SourceSearching {
        #[serde(rename = "source")]
        source_name: String,
    },

    #[serde(rename = "result")]
    SourceResult {
        #[serde(rename = "source")]
        source_name: String,
        #[serde(rename = "completed")]
        completed_count: u32,
        #[serde(rename = "count")]
        book_count: u32,
        #[serde(default)]
        books: Vec<BookSummary>,
    },

    #[serde(rename = "error_source")]
    SourceError {
        #[serde(rename = "source")]
        source_name: String,
        #[serde(rename = "completed")]
        completed_count: u32,
        #[serde(rename = "error")]
        error_message: String,
    },

    #[serde(rename = "complete")]
    Complete {
        total_books: u32,
        #[serde(default)]
        books: Vec<BookSummary>,
    },

    #[serde(rename = "error")]
    Fatal { message: String },
}

impl StreamEvent {
    /// Every `type` discriminator the backend emits.
    pub const KINDS: [&'static str; 6] = [
        "start",
        "searching",
        "result",
        "error_source",
        "complete",
        "error",
    ];

    /// Wire name of this event's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::SourceSearching { .. } => "searching",
            Self::SourceResult { .. } => "result",
            Self::SourceError { .. } => "error_source",
            Self::Complete { .. } => "complete",
            Self::Fatal { .. } => "error",
        }
    }

    /// Returns true for `Complete` and `Fatal`, the only events that may end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Fatal { .. })
    }
}

// =============================================================================
// Sources
// =============================================================================

/// A configured source as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceInfo {
    pub id: u32,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub comment: String,
    pub search_enabled: bool,
    pub has_crawl_config: bool,
}

/// Health-check verdict for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Warning,
    Error,
    Disabled,
    #[serde(other)]
    Unknown,
}

/// One row of the batch health check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceCheck {
    pub id: u32,
    pub name: String,
    pub url: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub book_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SourceCheckSummary {
    pub total: u32,
    pub success: u32,
    pub error: u32,
    pub warning: u32,
    pub disabled: u32,
}

/// Full batch health-check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCheckReport {
    pub sources: Vec<SourceCheck>,
    pub summary: SourceCheckSummary,
}

// =============================================================================
// Downloads
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    #[default]
    Txt,
    Epub,
}

impl std::str::FromStr for DownloadFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" => Ok(Self::Txt),
            "epub" => Ok(Self::Epub),
            other => Err(format!("unsupported format: {other} (expected txt or epub)")),
        }
    }
}

/// Request to queue a background download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub book_url: String,
    pub source_id: u32,

    /// 1-based first chapter
    pub start_chapter: i32,

    /// Last chapter, `-1` for the final one
    pub end_chapter: i32,

    pub format: DownloadFormat,
}

impl DownloadRequest {
    /// Download every chapter of `book_url` as plain text.
    pub fn new(book_url: impl Into<String>, source_id: u32) -> Self {
        Self {
            book_url: book_url.into(),
            source_id,
            start_chapter: 1,
            end_chapter: -1,
            format: DownloadFormat::default(),
        }
    }

    /// Build a request for a book returned by a search.
    pub fn for_book(book: &BookSummary) -> Self {
        Self::new(book.url.clone(), book.source_id)
    }

    pub fn chapters(mut self, start: i32, end: i32) -> Self {
        self.start_chapter = start;
        self.end_chapter = end;
        self
    }

    pub fn format(mut self, format: DownloadFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl TaskStatus {
    /// True once the task can no longer change.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A background download task as tracked by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadTask {
    pub id: String,
    pub book_url: String,
    pub source_name: String,
    pub status: TaskStatus,
    /// Percentage in `0..=100`
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub total_chapters: u32,
    #[serde(default)]
    pub downloaded_chapters: u32,
    #[serde(default)]
    pub book_name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
}

/// A finished file in the backend's download directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadedFile {
    pub name: String,
    pub size: u64,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

// =============================================================================
// Envelope
// =============================================================================

/// Wrapper shared by every JSON endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub summary: Option<SourceCheckSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskCreated {
    pub task_id: String,
}
