//! Effects produced by state transitions

use crate::status::Severity;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the history of `session_id`
    FetchHistory { epoch: u64, session_id: String },

    /// Send `text`; no session id means "create one"
    SendMessage {
        epoch: u64,
        text: String,
        session_id: Option<String>,
    },

    /// The service assigned an id to the session being composed
    SessionCreated { session_id: String },

    /// A session gained messages, possibly one no longer bound
    SessionUpdated { session_id: String },

    /// Surface a notice to the user
    Notify { severity: Severity, message: String },
}

impl Effect {
    pub fn error(message: impl Into<String>) -> Self {
        Effect::Notify {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}
