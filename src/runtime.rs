//! Runtime for the conversation client
//!
//! One event loop owns every piece of client state: the active session
//! pointer, the transcript engine, the session registry and the status
//! relay. Network calls run as spawned tasks and report back through a
//! channel; handlers never await.

mod executor;


pub use executor::ChatRuntime;

use crate::state_machine::Message;
use crate::status::{Connectivity, Notice};
use crate::transport::SessionSummary;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// User intents accepted by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send { text: String },
    SelectSession { session_id: String },
    NewSession,
    RefreshSessions,
}

/// Everything a presentation layer may show, captured after each change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub active_session: Option<String>,
    pub transcript: Vec<Message>,
    pub sending: bool,
    pub loading_history: bool,
    pub sessions: Vec<SessionSummary>,
    pub sessions_loading: bool,
    pub sessions_error: Option<String>,
    pub connectivity: Connectivity,
    pub notice: Option<Notice>,
}

#[derive(Debug, Error)]
#[error("conversation runtime has stopped")]
pub struct RuntimeStopped;

/// Handle used by presentation layers to drive a running [`ChatRuntime`]
#[derive(Clone)]
pub struct ChatHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<Snapshot>,
}

impl ChatHandle {
    pub async fn send(&self, text: impl Into<String>) -> Result<(), RuntimeStopped> {
        self.command(Command::Send { text: text.into() }).await
    }

    pub async fn select_session(&self, session_id: impl Into<String>) -> Result<(), RuntimeStopped> {
        self.command(Command::SelectSession {
            session_id: session_id.into(),
        })
        .await
    }

    pub async fn new_session(&self) -> Result<(), RuntimeStopped> {
        self.command(Command::NewSession).await
    }

    pub async fn refresh_sessions(&self) -> Result<(), RuntimeStopped> {
        self.command(Command::RefreshSessions).await
    }

    async fn command(&self, command: Command) -> Result<(), RuntimeStopped> {
        self.command_tx.send(command).await.map_err(|_| RuntimeStopped)
    }

    /// Latest published state
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }
}
