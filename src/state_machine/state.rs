//! Transcript state types

use crate::transport::HistoryEntry;
use serde::{Deserialize, Serialize};

/// Content shown by the assistant placeholder while a reply is outstanding
pub const PLACEHOLDER_TEXT: &str = "Thinking...";

// ============================================================================
// Messages
// ============================================================================

/// Who spoke a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Confirmation status of a single transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageStatus {
    /// Known to the service
    #[default]
    Confirmed,
    /// Applied locally, awaiting the service
    Pending,
    /// The service call for this entry failed; the entry stays visible
    Failed { reason: String },
}

/// A transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Client-generated for optimistic entries, server-assigned once confirmed
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Opaque ISO-8601 token, only ever parsed for display
    pub timestamp: String,
    #[serde(default)]
    pub status: MessageStatus,
}

impl Message {
    pub fn pending_user(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            timestamp: timestamp.into(),
            status: MessageStatus::Pending,
        }
    }

    pub fn placeholder(id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: PLACEHOLDER_TEXT.to_string(),
            timestamp: timestamp.into(),
            status: MessageStatus::Pending,
        }
    }

    pub fn confirmed_assistant(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: timestamp.into(),
            status: MessageStatus::Confirmed,
        }
    }

    /// Convert a history entry; the role comes from the user speaker sentinel
    pub fn from_history(entry: HistoryEntry, user_speaker_id: &str) -> Self {
        let role = if entry.speaker_id == user_speaker_id {
            Role::User
        } else {
            Role::Assistant
        };
        Self {
            id: entry.message_id,
            role,
            content: entry.content,
            timestamp: entry.timestamp,
            status: MessageStatus::Confirmed,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant && self.status == MessageStatus::Pending
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// Append-only ordered message list for one session.
///
/// The only removal ever performed is of the trailing pending placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The outstanding placeholder, if any (always the last entry)
    pub fn placeholder(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.is_placeholder())
    }

    /// Remove the placeholder with `id` if it is the last entry
    pub fn remove_placeholder(&mut self, id: &str) -> bool {
        if self.placeholder().is_some_and(|m| m.id == id) {
            self.messages.pop();
            true
        } else {
            false
        }
    }

    pub fn set_status(&mut self, id: &str, status: MessageStatus) {
        if let Some(message) = self.messages.iter_mut().rev().find(|m| m.id == id) {
            message.status = status;
        }
    }
}

// ============================================================================
// Engine State
// ============================================================================

/// Loading phase of the bound transcript
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// History for the bound session has been requested but not applied
    Loading,
    /// Ready for input
    #[default]
    Ready,
    /// A send is in flight; the placeholder is the last transcript entry
    AwaitingReply {
        user_message_id: String,
        placeholder_id: String,
    },
}

/// Complete state of the transcript engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    /// Session the transcript belongs to; `None` composes a new session
    pub session_id: Option<String>,
    /// Incremented on every bind; tags in-flight requests
    pub epoch: u64,
    pub phase: Phase,
    pub transcript: Transcript,
    /// Epoch of the send still awaiting a reply; survives binds
    pub outstanding_send: Option<u64>,
}

impl EngineState {
    pub fn is_sending(&self) -> bool {
        self.outstanding_send.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Does a completion tagged `epoch`/`session_id` still apply?
    pub fn is_current(&self, epoch: u64, session_id: Option<&str>) -> bool {
        self.epoch == epoch && self.session_id.as_deref() == session_id
    }
}

/// Immutable configuration for the engine
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Speaker id the service uses for the human user
    pub user_speaker_id: String,
}

impl EngineContext {
    pub fn new(user_speaker_id: impl Into<String>) -> Self {
        Self {
            user_speaker_id: user_speaker_id.into(),
        }
    }
}
