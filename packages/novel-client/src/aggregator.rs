//! Search aggregation state machine.
//!
//! Folds decoded `StreamEvent`s into an `AggregationState` and hands back an
//! immutable snapshot after every event. Pure: no IO, no async, one instance per
//! search.
//!
//! Books are appended in arrival order and never deduplicated here. The
//! `complete` event carries the backend's authoritative list and replaces
//! whatever was accumulated.

use tracing::{debug, warn};

use crate::error::ProtocolError;
use crate::types::{BookSummary, StreamEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Terminal {
    #[default]
    Running,
    Completed,
    Failed,
}

/// What the most recently active source did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Searching,
    Found { count: u32 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceActivity {
    pub source_name: String,
    pub outcome: SourceOutcome,
}

/// State of one search. Cloned as the per-event snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationState {
    pub keyword: String,
    pub total_sources: u32,
    /// Non-decreasing, never above `total_sources`.
    pub completed_sources: u32,
    pub accumulated_books: Vec<BookSummary>,
    pub terminal: Terminal,
    /// Set once `start` has been seen.
    pub started: bool,
    pub last_activity: Option<SourceActivity>,
    /// `total_books` as announced by the `complete` event.
    pub reported_total_books: Option<u32>,
    /// Why the search failed, when `terminal` is `Failed`.
    pub failure: Option<String>,
}

impl AggregationState {
    pub fn is_running(&self) -> bool {
        self.terminal == Terminal::Running
    }
}

/// Result of folding one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the event.
    pub snapshot: AggregationState,
    /// The event arrived after the stream closed and changed nothing.
    pub ignored: bool,
    pub violation: Option<ProtocolError>,
}

impl Transition {
    /// A fatal violation ends the stream.
    pub fn is_fatal(&self) -> bool {
        self.violation.as_ref().is_some_and(ProtocolError::is_fatal)
    }
}

#[derive(Debug, Default)]
pub struct SearchAggregator {
    state: AggregationState,
}

impl SearchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    pub fn snapshot(&self) -> AggregationState {
        self.state.clone()
    }

    pub fn into_state(self) -> AggregationState {
        self.state
    }

    /// Fold one event into the state.
    pub fn apply(&mut self, event: StreamEvent) -> Transition {
        if !self.state.is_running() {
            debug!(kind = event.kind(), "Ignoring event after stream closed");
            return self.transition(true, None);
        }

        let violation = self.decide(event);
        if let Some(violation) = &violation {
            warn!(error = %violation, fatal = violation.is_fatal(), "Search stream protocol violation");
            if violation.is_fatal() {
                self.state.terminal = Terminal::Failed;
                self.state.failure = Some(violation.to_string());
            }
        }

        self.transition(false, violation)
    }

    fn transition(&self, ignored: bool, violation: Option<ProtocolError>) -> Transition {
        Transition {
            snapshot: self.snapshot(),
            ignored,
            violation,
        }
    }

    fn decide(&mut self, event: StreamEvent) -> Option<ProtocolError> {
        let state = &mut self.state;

        if !state.started {
            return match event {
                StreamEvent::Start {
                    total_sources,
                    keyword,
                } => {
                    debug!(total_sources, keyword = %keyword, "Search started");
                    *state = AggregationState {
                        keyword,
                        total_sources,
                        started: true,
                        ..AggregationState::default()
                    };
                    None
                }
                // The backend rejects bad requests with a lone `error` record.
                StreamEvent::Fatal { message } => {
                    state.terminal = Terminal::Failed;
                    state.failure = Some(message);
                    None
                }
                other => Some(ProtocolError::MissingStart { kind: other.kind() }),
            };
        }

        match event {
            StreamEvent::Start { .. } => Some(ProtocolError::DuplicateStart),
            StreamEvent::SourceSearching { source_name } => {
                state.last_activity = Some(SourceActivity {
                    source_name,
                    outcome: SourceOutcome::Searching,
                });
                None
            }
            StreamEvent::SourceResult {
                source_name,
                completed_count,
                book_count,
                books,
            } => {
                let violation = advance_completed(state, completed_count);
                debug!(
                    source = %source_name,
                    book_count,
                    received = books.len(),
                    completed = state.completed_sources,
                    "Source returned results"
                );
                state.accumulated_books.extend(books);
                state.last_activity = Some(SourceActivity {
                    source_name,
                    outcome: SourceOutcome::Found { count: book_count },
                });
                violation
            }
            StreamEvent::SourceError {
                source_name,
                completed_count,
                error_message,
            } => {
                let violation = advance_completed(state, completed_count);
                debug!(source = %source_name, error = %error_message, "Source failed");
                state.last_activity = Some(SourceActivity {
                    source_name,
                    outcome: SourceOutcome::Failed {
                        error: error_message,
                    },
                });
                violation
            }
            StreamEvent::Complete { total_books, books } => {
                state.terminal = Terminal::Completed;
                state.completed_sources = state.total_sources;
                state.accumulated_books = books;
                state.reported_total_books = Some(total_books);
                None
            }
            StreamEvent::Fatal { message } => {
                state.terminal = Terminal::Failed;
                state.failure = Some(message);
                None
            }
        }
    }
}

/// Move `completed_sources` forward, clamping regressions and overflow.
fn advance_completed(state: &mut AggregationState, reported: u32) -> Option<ProtocolError> {
    if reported < state.completed_sources {
        return Some(ProtocolError::CompletedRegressed {
            current: state.completed_sources,
            reported,
        });
    }
    if reported > state.total_sources {
        state.completed_sources = state.total_sources;
        return Some(ProtocolError::CompletedOverflow {
            reported,
            total: state.total_sources,
        });
    }
    state.completed_sources = reported;
    None
}
