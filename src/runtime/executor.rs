//! Conversation runtime executor

use super::{ChatHandle, Command, Snapshot};
use crate::config::ClientConfig;
use crate::sessions::{RefreshOutcome, RefreshTicket, SessionRegistry};
use crate::state_machine::{transition, Effect, EngineContext, EngineState, Event};
use crate::status::{Severity, StatusRelay};
use crate::transport::{ConversationService, SessionSummary, TransportError};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Results of spawned work, fed back into the loop
#[derive(Debug)]
enum Completion {
    Engine(Event),
    Sessions {
        ticket: RefreshTicket,
        result: Result<Vec<SessionSummary>, TransportError>,
    },
    Health(Result<(), TransportError>),
    NoticeExpired {
        id: u64,
    },
}

/// Generic conversation runtime that can work with any service implementation
pub struct ChatRuntime<S>
where
    S: ConversationService + 'static,
{
    service: Arc<S>,
    context: EngineContext,
    /// The active session pointer; only this runtime changes it
    active_session: Option<String>,
    engine: EngineState,
    registry: SessionRegistry,
    status: StatusRelay,
    command_rx: mpsc::Receiver<Command>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl<S> ChatRuntime<S>
where
    S: ConversationService + 'static,
{
    pub fn new(service: Arc<S>, config: &ClientConfig) -> (Self, ChatHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

        let runtime = Self {
            service,
            context: EngineContext::new(config.user_speaker_id.clone()),
            active_session: None,
            engine: EngineState::default(),
            registry: SessionRegistry::new(),
            status: StatusRelay::new(config.notice_ttl),
            command_rx,
            completion_tx,
            completion_rx,
            snapshot_tx,
        };
        let handle = ChatHandle {
            command_tx,
            snapshot_rx,
        };
        (runtime, handle)
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("Starting conversation runtime");

        self.probe_health();
        let ticket = self.registry.refresh();
        self.spawn_refresh(ticket);
        self.publish();

        // Process inputs in a loop; every handler returns without awaiting
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }
            }
            self.publish();
        }

        tracing::info!("Conversation runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { text } => {
                self.apply(Event::Send {
                    text,
                    message_id: format!("user-{}", uuid::Uuid::new_v4()),
                    placeholder_id: format!("pending-{}", uuid::Uuid::new_v4()),
                    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                });
            }
            Command::SelectSession { session_id } => self.select_session(session_id),
            Command::NewSession => {
                self.active_session = None;
                self.apply(Event::Bind { session_id: None });
                self.notify(Severity::Success, "Started a new conversation");
            }
            Command::RefreshSessions => {
                let ticket = self.registry.refresh();
                self.spawn_refresh(ticket);
            }
        }
    }

    fn select_session(&mut self, session_id: String) {
        if self.active_session.as_deref() != Some(session_id.as_str()) {
            tracing::debug!(session_id = %session_id, "Switching session");
            self.active_session = Some(session_id.clone());
            self.apply(Event::Bind {
                session_id: Some(session_id.clone()),
            });
            if let Some(ticket) = self.registry.selection_changed(Some(&session_id)) {
                self.spawn_refresh(ticket);
            }
        }
        self.notify(Severity::Info, "Switched conversation");
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Engine(event) => self.apply(event),
            Completion::Sessions { ticket, result } => {
                match self.registry.complete_refresh(ticket, result) {
                    RefreshOutcome::Failed(message) => self.notify(Severity::Error, message),
                    RefreshOutcome::Replaced | RefreshOutcome::Stale => {}
                }
            }
            Completion::Health(result) => {
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "Conversation service unreachable");
                }
                self.status.record_health(&result);
            }
            Completion::NoticeExpired { id } => {
                self.status.expire(id);
            }
        }
    }

    /// Run one event through the transcript engine and execute its effects
    fn apply(&mut self, event: Event) {
        match transition(&self.engine, &self.context, event) {
            Ok(result) => {
                self.engine = result.new_state;
                for effect in result.effects {
                    self.execute_effect(effect);
                }
            }
            // Rejections are validation no-ops or stale results, never user-facing
            Err(e) => tracing::debug!(reason = %e, "Event ignored"),
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::FetchHistory { epoch, session_id } => {
                let service = Arc::clone(&self.service);
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let event = match service.get_history(&session_id).await {
                        Ok(history) => Event::HistoryLoaded {
                            epoch,
                            session_id,
                            history,
                        },
                        Err(e) => Event::HistoryFailed {
                            epoch,
                            session_id,
                            message: e.message,
                        },
                    };
                    let _ = tx.send(Completion::Engine(event));
                });
            }

            Effect::SendMessage {
                epoch,
                text,
                session_id,
            } => {
                let service = Arc::clone(&self.service);
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let event = match service.send_message(&text, session_id.as_deref()).await {
                        Ok(reply) => Event::ReplyReceived {
                            epoch,
                            session_id,
                            reply,
                        },
                        Err(e) => Event::ReplyFailed {
                            epoch,
                            session_id,
                            message: e.message,
                        },
                    };
                    let _ = tx.send(Completion::Engine(event));
                });
            }

            Effect::SessionCreated { session_id } => {
                tracing::info!(session_id = %session_id, "Adopted new session");
                self.active_session = Some(session_id.clone());
                if let Some(ticket) = self.registry.selection_changed(Some(&session_id)) {
                    self.spawn_refresh(ticket);
                }
            }

            Effect::SessionUpdated { session_id } => {
                tracing::debug!(session_id = %session_id, "Session changed on the server");
                let ticket = self.registry.active_session_mutated();
                self.spawn_refresh(ticket);
            }

            Effect::Notify { severity, message } => self.notify(severity, message),
        }
    }

    fn spawn_refresh(&self, ticket: RefreshTicket) {
        let service = Arc::clone(&self.service);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = service.list_sessions().await;
            let _ = tx.send(Completion::Sessions { ticket, result });
        });
    }

    /// The single health probe made at startup
    fn probe_health(&self) {
        let service = Arc::clone(&self.service);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = service.check_health().await;
            let _ = tx.send(Completion::Health(result));
        });
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        let id = self.status.notify(severity, message);
        let ttl = self.status.ttl();
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let _ = tx.send(Completion::NoticeExpired { id });
        });
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            active_session: self.active_session.clone(),
            transcript: self.engine.transcript.messages().to_vec(),
            sending: self.engine.is_sending(),
            loading_history: self.engine.is_loading(),
            sessions: self.registry.sessions().to_vec(),
            sessions_loading: self.registry.is_loading(),
            sessions_error: self.registry.last_error().map(str::to_string),
            connectivity: self.status.connectivity(),
            notice: self.status.notice_at(Instant::now()).cloned(),
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
