//! HTTP implementation of the conversation service

use super::{
    ChatReply, ChatRequest, ConversationService, Operation, SessionHistory, SessionSummary,
    TransportError,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// reqwest-backed client for the remote conversation service
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// `timeout` is the fixed upper bound applied to every call
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_json<T: DeserializeOwned>(
        operation: Operation,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(operation, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(operation, &e))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(operation = operation.name(), error = %e, "Response did not decode");
            TransportError::decode(operation)
        })
    }
}

#[async_trait]
impl ConversationService for HttpTransport {
    async fn send_message(
        &self,
        text: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, TransportError> {
        let op = Operation::SendMessage;
        let payload = ChatRequest {
            message: text.to_string(),
            session_id: session_id.map(str::to_string),
        };

        let response = self
            .client
            .post(self.endpoint(&["chat"]))
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(op, &e))?;

        Self::read_json(op, response).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, TransportError> {
        let op = Operation::ListSessions;
        let response = self
            .client
            .get(self.endpoint(&["sessions"]))
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(op, &e))?;

        Self::read_json(op, response).await
    }

    async fn get_history(&self, session_id: &str) -> Result<SessionHistory, TransportError> {
        let op = Operation::GetHistory;
        let response = self
            .client
            .get(self.endpoint(&["sessions", session_id]))
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(op, &e))?;

        Self::read_json(op, response).await
    }

    async fn check_health(&self) -> Result<(), TransportError> {
        let op = Operation::CheckHealth;
        let response = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(op, &e))?;

        // Only a plain 200 counts as healthy
        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(TransportError::status(op, response.status().as_u16()))
        }
    }
}
