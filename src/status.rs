//! Connectivity status and transient notices
//!
//! Purely reactive: the relay is told about outcomes and derives what to
//! show. It never talks to the service itself.

use crate::transport::TransportError;
use std::time::Duration;
use tokio::time::Instant;

/// Reachability of the conversation service, from the startup probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Checking,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// A transient notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Increases with every notice raised
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub raised_at: Instant,
}

pub struct StatusRelay {
    connectivity: Connectivity,
    notice: Option<Notice>,
    ttl: Duration,
    next_id: u64,
}

impl StatusRelay {
    pub fn new(ttl: Duration) -> Self {
        Self {
            connectivity: Connectivity::Checking,
            notice: None,
            ttl,
            next_id: 1,
        }
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn record_health(&mut self, result: &Result<(), TransportError>) {
        self.connectivity = match result {
            Ok(()) => Connectivity::Connected,
            Err(_) => Connectivity::Disconnected,
        };
    }

    /// Raise a notice, replacing any current one. Returns its id.
    pub fn notify(&mut self, severity: Severity, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.notice = Some(Notice {
            id,
            severity,
            message: message.into(),
            raised_at: Instant::now(),
        });
        id
    }

    /// The current notice, unless it has outlived the TTL at `now`
    pub fn notice_at(&self, now: Instant) -> Option<&Notice> {
        self.notice
            .as_ref()
            .filter(|n| now.duration_since(n.raised_at) < self.ttl)
    }

    /// Clear notice `id` if it is still the current one
    pub fn expire(&mut self, id: u64) -> bool {
        if self.notice.as_ref().is_some_and(|n| n.id == id) {
            self.notice = None;
            true
        } else {
            false
        }
    }
}
