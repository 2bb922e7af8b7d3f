//! Progress and status reporting.
//!
//! A `ProgressReport` is derived from an `AggregationState` and nothing else,
//! so rendering the same snapshot twice gives the same output.

use crate::aggregator::{AggregationState, SourceActivity, SourceOutcome, Terminal};
use crate::error::SearchError;
use crate::util::truncate_chars;

/// Source error messages are cut to this many characters for display.
pub const ERROR_SNIPPET_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    /// No `start` event yet.
    Waiting,
    Running,
    Completed,
    Failed,
    /// The stream stopped without a terminal event.
    Interrupted,
}

/// Human-facing view of one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub phase: ReportPhase,
    /// `completed / total` in `[0, 1]`; `0` when there are no sources.
    pub progress_fraction: f64,
    pub completed_sources: u32,
    pub total_sources: u32,
    pub headline: String,
    /// What the most recently active source did.
    pub status_line: Option<String>,
    /// Final line once the search has ended.
    pub summary: Option<String>,
}

impl ProgressReport {
    pub fn from_state(state: &AggregationState) -> Self {
        let phase = match state.terminal {
            Terminal::Completed => ReportPhase::Completed,
            Terminal::Failed => ReportPhase::Failed,
            Terminal::Running if !state.started => ReportPhase::Waiting,
            Terminal::Running => ReportPhase::Running,
        };

        let summary = match phase {
            ReportPhase::Completed => Some(format!(
                "Search complete! Found {} books",
                state
                    .reported_total_books
                    .unwrap_or(state.accumulated_books.len() as u32)
            )),
            ReportPhase::Failed => Some(format!(
                "Search failed: {}",
                state.failure.as_deref().unwrap_or("unknown error")
            )),
            _ => None,
        };

        Self {
            phase,
            progress_fraction: progress_fraction(state.completed_sources, state.total_sources),
            completed_sources: state.completed_sources,
            total_sources: state.total_sources,
            headline: headline(state),
            status_line: state.last_activity.as_ref().map(|activity| {
                status_line(activity, state.completed_sources, state.total_sources)
            }),
            summary,
        }
    }

    /// Report for a search that stopped on a client-side error.
    ///
    /// Partial results stay visible; the error replaces the summary.
    pub fn interrupted(state: &AggregationState, error: &SearchError) -> Self {
        let mut report = Self::from_state(state);
        if state.is_running() {
            report.phase = ReportPhase::Interrupted;
            report.summary = Some(format!(
                "Search interrupted: {} ({} results so far)",
                error,
                state.accumulated_books.len()
            ));
        }
        report
    }

    /// Progress as a whole percentage.
    pub fn percent(&self) -> u8 {
        (self.progress_fraction * 100.0).round() as u8
    }
}

pub fn progress_fraction(completed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64).clamp(0.0, 1.0)
}

fn headline(state: &AggregationState) -> String {
    if !state.started {
        return "Waiting for search to start...".to_string();
    }
    format!(
        "Searching for \"{}\" across {} sources",
        state.keyword, state.total_sources
    )
}

/// One-line description of a source's latest outcome.
pub fn status_line(activity: &SourceActivity, completed: u32, total: u32) -> String {
    let source = &activity.source_name;
    match &activity.outcome {
        SourceOutcome::Searching => format!("Searching: {}...", source),
        SourceOutcome::Found { count } => {
            format!("{}: found {} books ({}/{})", source, count, completed, total)
        }
        SourceOutcome::Failed { error } => format!(
            "{}: search failed - {} ({}/{})",
            source,
            truncate_chars(error, ERROR_SNIPPET_CHARS),
            completed,
            total
        ),
    }
}

/// Receives a report after every state transition, in event order.
pub trait RenderTarget {
    fn render(&mut self, report: &ProgressReport, state: &AggregationState);
}

impl<F> RenderTarget for F
where
    F: FnMut(&ProgressReport, &AggregationState),
{
    fn render(&mut self, report: &ProgressReport, state: &AggregationState) {
        self(report, state)
    }
}

/// Collects every report, for hosts that render after the fact.
impl RenderTarget for Vec<ProgressReport> {
    fn render(&mut self, report: &ProgressReport, _state: &AggregationState) {
        self.push(report.clone());
    }
}
