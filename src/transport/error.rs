//! Transport error types

use thiserror::Error;

/// Normalized transport failure.
///
/// Callers only ever see the human-readable `message`; `kind` exists for
/// logging and tests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(operation: Operation) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("{} (request timed out)", operation.failure_message()),
        )
    }

    pub fn connect(operation: Operation) -> Self {
        Self::new(
            TransportErrorKind::Connect,
            format!("{} (connection failed)", operation.failure_message()),
        )
    }

    pub fn status(operation: Operation, status: u16) -> Self {
        Self::new(
            TransportErrorKind::Status(status),
            format!("{} (HTTP {status})", operation.failure_message()),
        )
    }

    pub fn decode(operation: Operation) -> Self {
        Self::new(
            TransportErrorKind::Decode,
            format!("{} (unexpected response)", operation.failure_message()),
        )
    }

    pub fn unknown(operation: Operation) -> Self {
        Self::new(
            TransportErrorKind::Unknown,
            operation.failure_message().to_string(),
        )
    }

    /// Map a reqwest failure onto the normalized taxonomy
    pub fn from_reqwest(operation: Operation, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(operation)
        } else if err.is_connect() {
            Self::connect(operation)
        } else if err.is_decode() {
            Self::decode(operation)
        } else if let Some(status) = err.status() {
            Self::status(operation, status.as_u16())
        } else {
            Self::unknown(operation)
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The fixed per-call upper bound elapsed
    Timeout,
    /// Could not reach the service at all
    Connect,
    /// The service answered with a non-success status
    Status(u16),
    /// The body did not match the expected shape
    Decode,
    Unknown,
}

/// The four remote operations, used to word failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SendMessage,
    ListSessions,
    GetHistory,
    CheckHealth,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::SendMessage => "Failed to send message",
            Operation::ListSessions => "Failed to load conversations",
            Operation::GetHistory => "Failed to load conversation history",
            Operation::CheckHealth => "Cannot reach the conversation service",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::SendMessage => "send_message",
            Operation::ListSessions => "list_sessions",
            Operation::GetHistory => "get_history",
            Operation::CheckHealth => "check_health",
        }
    }
}
