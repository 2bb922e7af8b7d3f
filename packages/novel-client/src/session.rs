//! UI session context.
//!
//! Owns the state a host view needs across operations: the current tab, the
//! latest search snapshot, and the selected book. Every search gets a ticket;
//! only the newest ticket may update the session, so a superseded search can
//! never overwrite a newer one.

use tracing::debug;

use crate::aggregator::AggregationState;
use crate::error::SessionError;
use crate::types::BookSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Search,
    Sources,
    Tasks,
    Files,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Search, Tab::Sources, Tab::Tasks, Tab::Files];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Search => "Search",
            Tab::Sources => "Sources",
            Tab::Tasks => "Tasks",
            Tab::Files => "Files",
        }
    }
}

/// Identifies one search started through a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug, Default)]
pub struct Session {
    current_tab: Tab,
    generation: u64,
    search: Option<AggregationState>,
    selected_book: Option<BookSummary>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tab(&self) -> Tab {
        self.current_tab
    }

    /// Returns true if the tab changed.
    pub fn switch_tab(&mut self, tab: Tab) -> bool {
        let changed = self.current_tab != tab;
        self.current_tab = tab;
        changed
    }

    /// Task polling only runs while the task list is on screen.
    pub fn should_poll_tasks(&self) -> bool {
        self.current_tab == Tab::Tasks
    }

    /// Start a new search, discarding the previous results and selection.
    pub fn begin_search(&mut self) -> SearchTicket {
        self.generation += 1;
        self.search = None;
        self.selected_book = None;
        SearchTicket(self.generation)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Record a snapshot for `ticket`. Returns false if a newer search has started.
    pub fn accept(&mut self, ticket: SearchTicket, state: &AggregationState) -> bool {
        if !self.is_current(ticket) {
            debug!(
                ticket = ticket.0,
                current = self.generation,
                "Dropping snapshot from superseded search"
            );
            return false;
        }
        self.search = Some(state.clone());
        true
    }

    pub fn search_state(&self) -> Option<&AggregationState> {
        self.search.as_ref()
    }

    pub fn search_results(&self) -> &[BookSummary] {
        self.search
            .as_ref()
            .map(|state| state.accumulated_books.as_slice())
            .unwrap_or_default()
    }

    /// Select a book from the current results by position.
    pub fn select_book(&mut self, index: usize) -> Result<&BookSummary, SessionError> {
        let results = self.search_results();
        let book = results.get(index).cloned().ok_or(SessionError::NoSuchBook {
            index,
            len: results.len(),
        })?;
        Ok(self.selected_book.insert(book))
    }

    pub fn selected_book(&self) -> Option<&BookSummary> {
        self.selected_book.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected_book = None;
    }
}
