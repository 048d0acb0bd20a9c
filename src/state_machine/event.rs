//! Events that drive the transcript engine

use crate::transport::{ChatReply, SessionHistory};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Orchestrator events
    /// Switch to `session_id`, or to the unbound compose state
    Bind { session_id: Option<String> },

    // User events
    /// Ids and timestamp are generated by the caller so transitions stay pure
    Send {
        text: String,
        message_id: String,
        placeholder_id: String,
        timestamp: String,
    },

    // Service events, tagged with the epoch they were issued under
    HistoryLoaded {
        epoch: u64,
        session_id: String,
        history: SessionHistory,
    },
    HistoryFailed {
        epoch: u64,
        session_id: String,
        message: String,
    },
    ReplyReceived {
        epoch: u64,
        session_id: Option<String>,
        reply: ChatReply,
    },
    ReplyFailed {
        epoch: u64,
        session_id: Option<String>,
        message: String,
    },
}
