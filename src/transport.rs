//! Remote conversation service abstraction
//!
//! Every operation performs exactly one round trip and never retries.
//! Failures are normalized into [`TransportError`].

mod error;
mod http;
mod types;

pub use error::{Operation, TransportError, TransportErrorKind};
pub use http::HttpTransport;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for the remote conversation service
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Send a message; `None` asks the service to start a new session
    async fn send_message(
        &self,
        text: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, TransportError>;

    /// Fetch every session summary, in service order
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, TransportError>;

    /// Fetch the ordered history of one session
    async fn get_history(&self, session_id: &str) -> Result<SessionHistory, TransportError>;

    /// Probe reachability
    async fn check_health(&self) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: ConversationService + ?Sized> ConversationService for Arc<T> {
    async fn send_message(
        &self,
        text: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, TransportError> {
        (**self).send_message(text, session_id).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, TransportError> {
        (**self).list_sessions().await
    }

    async fn get_history(&self, session_id: &str) -> Result<SessionHistory, TransportError> {
        (**self).get_history(session_id).await
    }

    async fn check_health(&self) -> Result<(), TransportError> {
        (**self).check_health().await
    }
}

/// Logging wrapper for a conversation service
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: ConversationService> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    fn record<R>(operation: Operation, started: std::time::Instant, result: &Result<R, TransportError>) {
        let duration = started.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    operation = operation.name(),
                    duration_ms = %duration.as_millis(),
                    "Request completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    operation = operation.name(),
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Request failed"
                );
            }
        }
    }
}

#[async_trait]
impl<T: ConversationService> ConversationService for LoggingTransport<T> {
    async fn send_message(
        &self,
        text: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.send_message(text, session_id).await;
        Self::record(Operation::SendMessage, start, &result);
        if let Ok(reply) = &result {
            tracing::debug!(session_id = %reply.session_id, usage = ?reply.usage, "Reply usage");
        }
        result
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.list_sessions().await;
        Self::record(Operation::ListSessions, start, &result);
        result
    }

    async fn get_history(&self, session_id: &str) -> Result<SessionHistory, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.get_history(session_id).await;
        Self::record(Operation::GetHistory, start, &result);
        if let Ok(history) = &result {
            tracing::debug!(
                session_id,
                returned = history.messages.len(),
                total_messages = history.total_messages,
                "History fetched"
            );
        }
        result
    }

    async fn check_health(&self) -> Result<(), TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.check_health().await;
        Self::record(Operation::CheckHealth, start, &result);
        result
    }
}
