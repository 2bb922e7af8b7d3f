//! Error types for the novel client.
//!
//! `NovelError` covers request/response calls. Search streams use their own
//! taxonomy: `DecodeError` (one bad record, skipped), `ProtocolError` (event
//! ordering), and `TransportError` (the connection itself), gathered under
//! `SearchError`.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, NovelError>;

/// Client errors.
#[derive(Debug, Error)]
pub enum NovelError {
    /// Configuration error (missing or invalid base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response or `success: false` envelope)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rejected locally before any request was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for NovelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            NovelError::Parse(e.to_string())
        } else {
            NovelError::Network(e.to_string())
        }
    }
}

/// A single stream record could not be decoded.
///
/// Recoverable: the record is skipped and decoding continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("record payload is not valid JSON: {message} (data: {snippet})")]
    InvalidJson { message: String, snippet: String },

    #[error("record payload has no `type` discriminator (data: {snippet})")]
    MissingType { snippet: String },

    #[error("unrecognized event type `{kind}`")]
    UnknownType { kind: String },

    #[error("malformed `{kind}` event: {message}")]
    InvalidPayload { kind: String, message: String },

    /// The transport closed while a record was still incomplete.
    #[error("stream ended inside a record ({pending_bytes} bytes pending)")]
    Truncated { pending_bytes: usize },
}

impl DecodeError {
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

/// The event sequence broke the stream contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("`{kind}` event received before `start`")]
    MissingStart { kind: &'static str },

    #[error("duplicate `start` event")]
    DuplicateStart,

    #[error("completed count went backwards ({reported} < {current}), keeping {current}")]
    CompletedRegressed { current: u32, reported: u32 },

    #[error("completed count {reported} exceeds total {total}, clamped")]
    CompletedOverflow { reported: u32, total: u32 },
}

impl ProtocolError {
    /// Fatal violations abandon the stream; the rest are clamped and logged.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingStart { .. } | Self::DuplicateStart)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Network(String),

    #[error("stream closed before a terminal event")]
    ClosedBeforeTerminal,
}

/// Anything that can go wrong while consuming a search stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SearchError {
    /// Whether this error ends consumption of the stream.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Decode(_) => false,
            Self::Protocol(e) => e.is_fatal(),
            Self::Transport(_) => true,
        }
    }
}

/// Invalid operation on the UI session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no book at index {index} ({len} results)")]
    NoSuchBook { index: usize, len: usize },
}
