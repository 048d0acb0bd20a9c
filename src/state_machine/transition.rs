//! Pure state transition function

use super::state::{Message, MessageStatus, Phase, Transcript};
use super::{Effect, EngineContext, EngineState, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: EngineState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: EngineState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Events the engine refuses. None of these are user-visible errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a message is already being sent")]
    SendInFlight,
    #[error("history is still loading")]
    HistoryLoading,
    #[error("stale result for epoch {epoch} discarded")]
    StaleResult { epoch: u64 },
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// described by the returned effects.
pub fn transition(
    state: &EngineState,
    context: &EngineContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.phase, event) {
        // ============================================================
        // Binding
        // ============================================================

        // Any state + Bind(None) -> empty, ready to compose a new session
        (_, Event::Bind { session_id: None }) => Ok(TransitionResult::new(EngineState {
            session_id: None,
            epoch: state.epoch + 1,
            phase: Phase::Ready,
            transcript: Transcript::default(),
            outstanding_send: state.outstanding_send,
        })),

        // Any state + Bind(id) -> Loading, outstanding requests become stale
        (_, Event::Bind { session_id: Some(id) }) => {
            let epoch = state.epoch + 1;
            Ok(TransitionResult::new(EngineState {
                session_id: Some(id.clone()),
                epoch,
                phase: Phase::Loading,
                transcript: Transcript::default(),
                outstanding_send: state.outstanding_send,
            })
            .with_effect(Effect::FetchHistory {
                epoch,
                session_id: id,
            }))
        }

        // ============================================================
        // History
        // ============================================================
        (Phase::Loading, Event::HistoryLoaded { epoch, session_id, history })
            if state.is_current(epoch, Some(session_id.as_str())) =>
        {
            let messages = history
                .messages
                .into_iter()
                .map(|entry| Message::from_history(entry, &context.user_speaker_id))
                .collect();
            Ok(TransitionResult::new(EngineState {
                phase: Phase::Ready,
                transcript: Transcript::from_messages(messages),
                ..state.clone()
            }))
        }

        (Phase::Loading, Event::HistoryFailed { epoch, session_id, message })
            if state.is_current(epoch, Some(session_id.as_str())) =>
        {
            Ok(TransitionResult::new(EngineState {
                phase: Phase::Ready,
                transcript: Transcript::default(),
                ..state.clone()
            })
            .with_effect(Effect::error(message)))
        }

        (_, Event::HistoryLoaded { epoch, .. } | Event::HistoryFailed { epoch, .. }) => {
            Err(TransitionError::StaleResult { epoch })
        }

        // ============================================================
        // Sending
        // ============================================================
        (_, Event::Send { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        // Single-flight holds across binds until the reply settles
        (_, Event::Send { .. }) if state.outstanding_send.is_some() => {
            Err(TransitionError::SendInFlight)
        }

        (Phase::AwaitingReply { .. }, Event::Send { .. }) => Err(TransitionError::SendInFlight),

        (Phase::Loading, Event::Send { .. }) => Err(TransitionError::HistoryLoading),

        // Ready + Send -> AwaitingReply, user entry and placeholder appended
        (
            Phase::Ready,
            Event::Send {
                text,
                message_id,
                placeholder_id,
                timestamp,
            },
        ) => {
            let text = text.trim().to_string();
            let mut transcript = state.transcript.clone();
            transcript.push(Message::pending_user(&message_id, &text, &timestamp));
            transcript.push(Message::placeholder(&placeholder_id, timestamp));

            Ok(TransitionResult::new(EngineState {
                phase: Phase::AwaitingReply {
                    user_message_id: message_id,
                    placeholder_id,
                },
                transcript,
                outstanding_send: Some(state.epoch),
                ..state.clone()
            })
            .with_effect(Effect::SendMessage {
                epoch: state.epoch,
                text,
                session_id: state.session_id.clone(),
            }))
        }

        // ============================================================
        // Replies
        // ============================================================
        (
            Phase::AwaitingReply {
                user_message_id,
                placeholder_id,
            },
            Event::ReplyReceived {
                epoch,
                session_id,
                reply,
            },
        ) if state.is_current(epoch, session_id.as_deref()) => {
            let mut transcript = state.transcript.clone();
            transcript.remove_placeholder(placeholder_id);
            transcript.set_status(user_message_id, MessageStatus::Confirmed);
            transcript.push(Message::confirmed_assistant(
                &reply.message_id,
                &reply.reply_text,
                &reply.timestamp,
            ));

            // A compose-state transcript adopts the server-assigned id
            let (bound, effect) = match &state.session_id {
                None => (
                    reply.session_id.clone(),
                    Effect::SessionCreated {
                        session_id: reply.session_id,
                    },
                ),
                Some(id) => (
                    id.clone(),
                    Effect::SessionUpdated {
                        session_id: id.clone(),
                    },
                ),
            };

            Ok(TransitionResult::new(EngineState {
                session_id: Some(bound),
                epoch: state.epoch,
                phase: Phase::Ready,
                transcript,
                outstanding_send: None,
            })
            .with_effect(effect))
        }

        (
            Phase::AwaitingReply {
                user_message_id,
                placeholder_id,
            },
            Event::ReplyFailed {
                epoch,
                session_id,
                message,
            },
        ) if state.is_current(epoch, session_id.as_deref()) => {
            let mut transcript = state.transcript.clone();
            transcript.remove_placeholder(placeholder_id);
            transcript.set_status(
                user_message_id,
                MessageStatus::Failed {
                    reason: message.clone(),
                },
            );

            Ok(TransitionResult::new(EngineState {
                phase: Phase::Ready,
                transcript,
                outstanding_send: None,
                ..state.clone()
            })
            .with_effect(Effect::error(message)))
        }

        // Reply to a send made before the last bind: the transcript it
        // belonged to is gone, but the send is settled and the server-side
        // session may have changed
        (_, Event::ReplyReceived { epoch, reply, .. })
            if state.outstanding_send == Some(epoch) =>
        {
            Ok(TransitionResult::new(EngineState {
                outstanding_send: None,
                ..state.clone()
            })
            .with_effect(Effect::SessionUpdated {
                session_id: reply.session_id,
            }))
        }

        (_, Event::ReplyFailed { epoch, .. }) if state.outstanding_send == Some(epoch) => {
            Ok(TransitionResult::new(EngineState {
                outstanding_send: None,
                ..state.clone()
            }))
        }

        (_, Event::ReplyReceived { epoch, .. } | Event::ReplyFailed { epoch, .. }) => {
            Err(TransitionError::StaleResult { epoch })
        }
    }
}
