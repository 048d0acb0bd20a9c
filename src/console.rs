//! Line-oriented terminal front end
//!
//! Reads commands from stdin and prints transcript changes as they are
//! published by the runtime. Lines not starting with `/` are sent as
//! messages.

use crate::format::{message_time, session_age};
use crate::runtime::{ChatHandle, RuntimeStopped, Snapshot};
use crate::state_machine::{Message, MessageStatus, Role};
use crate::status::{Connectivity, Severity};
use std::collections::HashSet;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

/// Label for sessions the service has no preview for
const UNTITLED: &str = "New Chat";

const HELP: &str = "\
Commands:
  /new           start a new conversation
  /sessions      list conversations
  /open <n|id>   open a conversation by list number or id
  /refresh       reload the conversation list
  /quit          exit
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    NewSession,
    ListSessions,
    Open(String),
    Refresh,
    Quit,
    Help,
    Unknown(String),
    Empty,
}

pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));
    match (name, arg) {
        ("new", "") => Input::NewSession,
        ("sessions", "") => Input::ListSessions,
        ("refresh", "") => Input::Refresh,
        ("quit" | "exit", "") => Input::Quit,
        ("help", _) => Input::Help,
        ("open", arg) if !arg.is_empty() => Input::Open(arg.to_string()),
        _ => Input::Unknown(line.to_string()),
    }
}

/// Resolve a 1-based list position or a literal id against the session list
pub fn resolve_session(arg: &str, snapshot: &Snapshot) -> Option<String> {
    if let Ok(n) = arg.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| snapshot.sessions.get(i))
            .map(|s| s.session_id.clone());
    }
    snapshot
        .sessions
        .iter()
        .find(|s| s.session_id == arg)
        .map(|s| s.session_id.clone())
}

pub fn session_lines(snapshot: &Snapshot) -> Vec<String> {
    if let Some(error) = &snapshot.sessions_error {
        return vec![format!("! {error}")];
    }
    if snapshot.sessions.is_empty() {
        let line = if snapshot.sessions_loading {
            "Loading conversations..."
        } else {
            "No conversations yet"
        };
        return vec![line.to_string()];
    }

    snapshot
        .sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let marker = if snapshot.active_session.as_deref() == Some(session.session_id.as_str()) {
                '*'
            } else {
                ' '
            };
            let title = if session.preview.trim().is_empty() {
                UNTITLED
            } else {
                session.preview.as_str()
            };
            // Sessions that never got a message only carry a creation time
            let active_at = if session.last_message_at.is_empty() {
                &session.created_at
            } else {
                &session.last_message_at
            };
            format!(
                "{marker}{:>3}. {title}  ({}, {} messages)",
                i + 1,
                session_age(active_at),
                session.message_count
            )
        })
        .collect()
}

/// Why a typed message cannot be sent right now, if it cannot
pub fn send_blocked(snapshot: &Snapshot) -> Option<&'static str> {
    if snapshot.sending {
        Some("Still waiting for the previous reply")
    } else if snapshot.loading_history {
        Some("Conversation is still loading")
    } else {
        None
    }
}

fn message_line(message: &Message) -> String {
    let speaker = match message.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    format!(
        "[{}] {speaker}: {}",
        message_time(&message.timestamp),
        message.content
    )
}

/// Turns successive snapshots into the lines that changed
#[derive(Default)]
pub struct Renderer {
    session: Option<String>,
    /// Ids of transcript entries already printed, in order
    printed: Vec<String>,
    placeholder_shown: Option<String>,
    failures_reported: HashSet<String>,
    notice_shown: Option<u64>,
    connectivity: Connectivity,
}

impl Renderer {
    pub fn render(&mut self, snapshot: &Snapshot) -> Vec<String> {
        let mut out = Vec::new();

        if snapshot.connectivity != self.connectivity {
            match snapshot.connectivity {
                Connectivity::Disconnected => out.push(
                    "! Cannot reach the conversation service. Make sure it is running.".to_string(),
                ),
                Connectivity::Connected => out.push("Connected.".to_string()),
                Connectivity::Checking => {}
            }
            self.connectivity = snapshot.connectivity;
        }

        let visible: Vec<&Message> = snapshot
            .transcript
            .iter()
            .filter(|m| !m.is_placeholder())
            .collect();
        let continues = self.printed.len() <= visible.len()
            && self.printed.iter().zip(&visible).all(|(id, m)| *id == m.id);
        // A new conversation adopting its server id keeps its transcript
        let adopted = self.session.is_none() && continues;
        if !continues || (snapshot.active_session != self.session && !adopted) {
            out.push(match &snapshot.active_session {
                Some(id) => format!("--- conversation {id} ---"),
                None => "--- new conversation ---".to_string(),
            });
            self.printed.clear();
        }
        self.session.clone_from(&snapshot.active_session);

        if snapshot.loading_history && visible.is_empty() {
            out.push("Loading conversation...".to_string());
        }
        for message in visible.iter().skip(self.printed.len()) {
            out.push(message_line(message));
            self.printed.push(message.id.clone());
        }
        for message in &visible {
            if let MessageStatus::Failed { reason } = &message.status {
                if self.failures_reported.insert(message.id.clone()) {
                    out.push(format!("  ! not delivered: {reason}"));
                }
            }
        }

        if let Some(placeholder) = snapshot.transcript.last().filter(|m| m.is_placeholder()) {
            if self.placeholder_shown.as_ref() != Some(&placeholder.id) {
                out.push(format!("Assistant: {}", placeholder.content));
                self.placeholder_shown = Some(placeholder.id.clone());
            }
        }

        if let Some(notice) = &snapshot.notice {
            if self.notice_shown != Some(notice.id) {
                let tag = match notice.severity {
                    Severity::Success => "ok",
                    Severity::Error => "error",
                    Severity::Info => "info",
                };
                out.push(format!("({tag}) {}", notice.message));
                self.notice_shown = Some(notice.id);
            }
        }

        out
    }
}

/// Print changes until the runtime goes away
pub async fn render_loop(mut snapshots: watch::Receiver<Snapshot>) {
    let mut renderer = Renderer::default();
    loop {
        let lines = renderer.render(&snapshots.borrow_and_update());
        for line in lines {
            println!("{line}");
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

/// Read commands from stdin until `/quit`, end of input or Ctrl-C
pub async fn read_commands(handle: &ChatHandle) -> Result<(), RuntimeStopped> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read input");
                    break;
                }
            },
        };

        match parse_line(&line) {
            Input::Message(text) => match send_blocked(&handle.snapshot()) {
                Some(reason) => println!("{reason}; message not sent"),
                None => handle.send(text).await?,
            },
            Input::NewSession => handle.new_session().await?,
            Input::ListSessions => {
                for line in session_lines(&handle.snapshot()) {
                    println!("{line}");
                }
            }
            Input::Open(arg) => match resolve_session(&arg, &handle.snapshot()) {
                Some(session_id) => handle.select_session(session_id).await?,
                None => println!("No conversation matches {arg:?}; try /sessions"),
            },
            Input::Refresh => handle.refresh_sessions().await?,
            Input::Quit => break,
            Input::Help => println!("{HELP}"),
            Input::Unknown(line) => println!("Unknown command {line:?}; try /help"),
            Input::Empty => {}
        }
    }

    Ok(())
}
