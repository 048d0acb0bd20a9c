//! Wire types exchanged with the remote conversation service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Omitted entirely to ask the service for a new session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Reply to `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(rename = "response")]
    pub reply_text: String,
    pub session_id: String,
    pub message_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub usage: Map<String, Value>,
}

/// Summary row from `GET /sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: String,
    #[serde(default)]
    pub last_message_at: String,
    #[serde(default)]
    pub message_count: u64,
    /// Derived by the service from the latest message
    #[serde(default)]
    pub preview: String,
}

/// One entry of a session's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message_id: String,
    pub speaker_id: String,
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    #[allow(dead_code)] // Part of the wire format; not displayed
    pub word_count: u64,
    #[serde(default)]
    #[allow(dead_code)] // Part of the wire format; not displayed
    pub metadata: Map<String, Value>,
}

/// Reply to `GET /sessions/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session_id: String,
    pub messages: Vec<HistoryEntry>,
    #[serde(default)]
    pub total_messages: u64,
}
