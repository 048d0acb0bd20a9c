//! Session registry
//!
//! Holds the session summary list. The list is only ever replaced wholesale
//! by a refresh; the registry never patches previews from local sends, so
//! it cannot drift from what the service reports.

use crate::transport::{SessionSummary, TransportError};

/// Identifies one refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

/// What a completed refresh did to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Replaced,
    /// The held list was left untouched
    Failed(String),
    /// A newer refresh already settled, successfully or not
    Stale,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<SessionSummary>,
    issued: u64,
    /// Newest ticket that has completed either way
    settled: u64,
    in_flight: usize,
    last_error: Option<String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start a refresh; the caller performs the fetch and reports back
    pub fn refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        self.in_flight += 1;
        RefreshTicket(self.issued)
    }

    /// The user picked a session; only a concrete selection reloads
    pub fn selection_changed(&mut self, session_id: Option<&str>) -> Option<RefreshTicket> {
        session_id.map(|_| self.refresh())
    }

    /// The active session gained messages
    pub fn active_session_mutated(&mut self) -> RefreshTicket {
        self.refresh()
    }

    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<SessionSummary>, TransportError>,
    ) -> RefreshOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);

        if ticket.0 < self.settled {
            tracing::debug!(ticket = ticket.0, settled = self.settled, "Discarding stale session list");
            return RefreshOutcome::Stale;
        }
        self.settled = ticket.0;

        match result {
            Ok(sessions) => {
                self.sessions = sessions;
                self.last_error = None;
                RefreshOutcome::Replaced
            }
            Err(e) => {
                self.last_error = Some(e.message.clone());
                RefreshOutcome::Failed(e.message)
            }
        }
    }
}
