//! Search consumption loop.
//!
//! Pulls the next decoded event, folds it into the aggregator, then renders.
//! Chunk arrival is the only suspension point. Bad records and failed sources
//! are absorbed; protocol violations that break the stream contract and
//! transport failures end consumption, keeping whatever was accumulated.

use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aggregator::{AggregationState, SearchAggregator, Terminal};
use crate::error::{DecodeError, ProtocolError, SearchError, TransportError};
use crate::reporter::{ProgressReport, RenderTarget};
use crate::types::{BookSummary, StreamEvent};

/// Everything a finished (or abandoned) search leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub state: AggregationState,
    /// Skipped records, plus at most one truncation report.
    pub decode_errors: Vec<DecodeError>,
    /// Clamped, non-fatal protocol violations.
    pub violations: Vec<ProtocolError>,
    /// The error that ended the search early, if any.
    pub error: Option<SearchError>,
    /// Consumption was stopped by the caller.
    pub cancelled: bool,
}

impl SearchOutcome {
    pub fn books(&self) -> &[BookSummary] {
        &self.state.accumulated_books
    }

    /// Completed normally with the backend's final list.
    pub fn is_complete(&self) -> bool {
        self.state.terminal == Terminal::Completed && self.error.is_none()
    }

    /// Report describing how the search ended.
    pub fn report(&self) -> ProgressReport {
        match &self.error {
            Some(error) => ProgressReport::interrupted(&self.state, error),
            None => ProgressReport::from_state(&self.state),
        }
    }
}

/// Consume a search stream to the end, rendering after every transition.
pub async fn consume<S, R>(events: S, render: &mut R) -> SearchOutcome
where
    S: Stream<Item = Result<StreamEvent, SearchError>> + Unpin,
    R: RenderTarget + ?Sized,
{
    consume_until_cancelled(events, render, &CancellationToken::new()).await
}

/// Like [`consume`], but stops pulling chunks once `cancel` fires.
///
/// Cancellation drops the stream; no signal reaches the backend.
pub async fn consume_until_cancelled<S, R>(
    mut events: S,
    render: &mut R,
    cancel: &CancellationToken,
) -> SearchOutcome
where
    S: Stream<Item = Result<StreamEvent, SearchError>> + Unpin,
    R: RenderTarget + ?Sized,
{
    let mut aggregator = SearchAggregator::new();
    let mut decode_errors = Vec::new();
    let mut violations = Vec::new();
    let mut error: Option<SearchError> = None;
    let mut cancelled = false;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                cancelled = true;
                break;
            }
            next = events.next() => next,
        };
        let Some(item) = next else { break };

        match item {
            Ok(event) => {
                let transition = aggregator.apply(event);
                if transition.ignored {
                    continue;
                }

                render.render(
                    &ProgressReport::from_state(&transition.snapshot),
                    &transition.snapshot,
                );

                if let Some(violation) = transition.violation {
                    if violation.is_fatal() {
                        error = Some(violation.into());
                        break;
                    }
                    violations.push(violation);
                }
                if !transition.snapshot.is_running() {
                    break;
                }
            }
            Err(SearchError::Decode(e)) => decode_errors.push(e),
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }
    drop(events);

    let state = aggregator.into_state();
    if cancelled {
        info!(books = state.accumulated_books.len(), "Search cancelled");
    } else if error.is_none() && state.is_running() {
        error = Some(TransportError::ClosedBeforeTerminal.into());
    }

    if let Some(e) = &error {
        warn!(error = %e, books = state.accumulated_books.len(), "Search ended early");
        if state.is_running() {
            render.render(&ProgressReport::interrupted(&state, e), &state);
        }
    }

    info!(
        keyword = %state.keyword,
        terminal = ?state.terminal,
        books = state.accumulated_books.len(),
        decode_errors = decode_errors.len(),
        violations = violations.len(),
        "Search finished"
    );

    SearchOutcome {
        state,
        decode_errors,
        violations,
        error,
        cancelled,
    }
}
