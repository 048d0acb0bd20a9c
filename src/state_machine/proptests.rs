//! Property-based tests for the transcript engine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::state::*;
use super::transition::*;
use super::*;
use crate::transport::{ChatReply, HistoryEntry, SessionHistory};
use proptest::prelude::*;
use serde_json::Map;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> EngineContext {
    EngineContext::new("用户")
}

fn send_event(text: String, n: usize) -> Event {
    Event::Send {
        text,
        message_id: format!("user-{n}"),
        placeholder_id: format!("pending-{n}"),
        timestamp: "2025-03-01T10:00:00Z".to_string(),
    }
}

fn reply_for(session_id: &str, n: usize) -> ChatReply {
    ChatReply {
        reply_text: format!("reply {n}"),
        session_id: session_id.to_string(),
        message_id: format!("m{n}"),
        timestamp: "2025-03-01T10:00:01Z".to_string(),
        usage: Map::new(),
    }
}

fn history_of(session_id: &str, len: usize) -> SessionHistory {
    SessionHistory {
        session_id: session_id.to_string(),
        messages: (0..len)
            .map(|i| HistoryEntry {
                message_id: format!("{session_id}-{i}"),
                speaker_id: if i % 2 == 0 { "用户" } else { "bot" }.to_string(),
                content: format!("{session_id} {i}"),
                timestamp: "2025-03-01T09:00:00".to_string(),
                word_count: 2,
                metadata: Map::new(),
            })
            .collect(),
        total_messages: len as u64,
    }
}

fn assistant_count(state: &EngineState) -> usize {
    state
        .transcript
        .messages()
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .count()
}

fn user_count(state: &EngineState) -> usize {
    state.transcript.messages().len() - assistant_count(state)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    "[ \t]{0,2}[a-zA-Z0-9?!]{1,20}[ \n]{0,2}"
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,5}"
}

/// Abstract user and service actions; concrete events are derived from the
/// state at the time they are applied so that completions are mostly current.
#[derive(Debug, Clone)]
enum Action {
    Send(String),
    Bind(Option<String>),
    ReplyOk,
    ReplyErr,
    HistoryOk(usize),
    HistoryErr,
    /// A completion for a request issued under an older epoch; settles an
    /// abandoned send when there is one
    StaleReply,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => arb_text().prop_map(Action::Send),
        1 => arb_blank().prop_map(Action::Send),
        1 => proptest::option::of(prop_oneof![Just("a".to_string()), Just("b".to_string())])
            .prop_map(Action::Bind),
        2 => Just(Action::ReplyOk),
        1 => Just(Action::ReplyErr),
        2 => (0usize..4).prop_map(Action::HistoryOk),
        1 => Just(Action::HistoryErr),
        1 => Just(Action::StaleReply),
    ]
}

fn to_event(state: &EngineState, action: Action, n: usize) -> Event {
    let session_id = state.session_id.clone();
    match action {
        Action::Send(text) => send_event(text, n),
        Action::Bind(session_id) => Event::Bind { session_id },
        Action::ReplyOk => Event::ReplyReceived {
            epoch: state.epoch,
            reply: reply_for(session_id.as_deref().unwrap_or("new"), n),
            session_id,
        },
        Action::ReplyErr => Event::ReplyFailed {
            epoch: state.epoch,
            session_id,
            message: "Failed to send message".to_string(),
        },
        Action::HistoryOk(len) => {
            let id = session_id.unwrap_or_else(|| "a".to_string());
            Event::HistoryLoaded {
                epoch: state.epoch,
                history: history_of(&id, len),
                session_id: id,
            }
        }
        Action::HistoryErr => Event::HistoryFailed {
            epoch: state.epoch,
            session_id: session_id.unwrap_or_else(|| "a".to_string()),
            message: "Failed to load conversation history".to_string(),
        },
        Action::StaleReply => Event::ReplyReceived {
            epoch: state
                .outstanding_send
                .filter(|epoch| *epoch != state.epoch)
                .unwrap_or_else(|| state.epoch.wrapping_sub(1)),
            reply: reply_for("stale", n),
            session_id,
        },
    }
}

/// Apply an action, treating rejected events as no-ops like the runtime does
fn step(state: EngineState, action: Action, n: usize) -> EngineState {
    let event = to_event(&state, action, n);
    match transition(&state, &test_context(), event) {
        Ok(result) => result.new_state,
        Err(_) => state,
    }
}

fn arb_ready_state() -> impl Strategy<Value = EngineState> {
    (
        proptest::option::of("[a-z]{1,6}"),
        0u64..10,
        0usize..6,
    )
        .prop_map(|(session_id, epoch, len)| {
            let transcript = match &session_id {
                Some(id) => {
                    let history = history_of(id, len);
                    Transcript::from_messages(
                        history
                            .messages
                            .into_iter()
                            .map(|e| Message::from_history(e, "用户"))
                            .collect(),
                    )
                }
                None => Transcript::default(),
            };
            EngineState {
                session_id,
                epoch,
                phase: Phase::Ready,
                transcript,
                outstanding_send: None,
            }
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A successful send adds exactly one user and one assistant message
    #[test]
    fn prop_send_success_adds_one_pair(state in arb_ready_state(), text in arb_text()) {
        let before_users = user_count(&state);
        let before_assistants = assistant_count(&state);

        let sent = transition(&state, &test_context(), send_event(text.clone(), 1)).unwrap();
        prop_assert_eq!(
            sent.new_state.transcript.messages().len(),
            state.transcript.messages().len() + 2
        );
        prop_assert!(sent.new_state.transcript.placeholder().is_some());

        let session_id = state.session_id.clone();
        let done = transition(&sent.new_state, &test_context(), Event::ReplyReceived {
            epoch: state.epoch,
            reply: reply_for(session_id.as_deref().unwrap_or("fresh"), 1),
            session_id,
        }).unwrap();

        prop_assert_eq!(user_count(&done.new_state), before_users + 1);
        prop_assert_eq!(assistant_count(&done.new_state), before_assistants + 1);
        prop_assert!(done.new_state.transcript.placeholder().is_none());
        prop_assert_eq!(&done.new_state.transcript.messages()[before_users + before_assistants].content, text.trim());
        prop_assert!(done.new_state.session_id.is_some());
    }

    /// A failed send leaves exactly one new user message and no new assistant message
    #[test]
    fn prop_send_failure_keeps_only_user(state in arb_ready_state(), text in arb_text()) {
        let before_users = user_count(&state);
        let before_assistants = assistant_count(&state);

        let sent = transition(&state, &test_context(), send_event(text, 1)).unwrap();
        let failed = transition(&sent.new_state, &test_context(), Event::ReplyFailed {
            epoch: state.epoch,
            session_id: state.session_id.clone(),
            message: "Failed to send message".to_string(),
        }).unwrap();

        prop_assert_eq!(user_count(&failed.new_state), before_users + 1);
        prop_assert_eq!(assistant_count(&failed.new_state), before_assistants);
        prop_assert_eq!(&failed.new_state.phase, &Phase::Ready);
        prop_assert_eq!(&failed.new_state.session_id, &state.session_id);
    }

    /// Sending while a send is pending changes nothing
    #[test]
    fn prop_second_send_is_rejected(state in arb_ready_state(), first in arb_text(), second in arb_text()) {
        let pending = transition(&state, &test_context(), send_event(first, 1)).unwrap().new_state;
        let result = transition(&pending, &test_context(), send_event(second, 2));
        prop_assert_eq!(result.unwrap_err(), TransitionError::SendInFlight);
    }

    /// Blank input is always rejected
    #[test]
    fn prop_blank_send_is_rejected(state in arb_ready_state(), text in arb_blank()) {
        let result = transition(&state, &test_context(), send_event(text, 1));
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyMessage);
    }

    /// Binding to none always yields an empty, ready transcript with no effects
    #[test]
    fn prop_bind_none_clears(actions in proptest::collection::vec(arb_action(), 0..20)) {
        let mut state = EngineState::default();
        for (n, action) in actions.into_iter().enumerate() {
            state = step(state, action, n);
        }
        let cleared = transition(&state, &test_context(), Event::Bind { session_id: None }).unwrap();
        prop_assert!(cleared.new_state.transcript.messages().is_empty());
        prop_assert_eq!(&cleared.new_state.phase, &Phase::Ready);
        prop_assert!(cleared.effects.is_empty());
        prop_assert!(cleared.new_state.epoch > state.epoch);
    }

    /// At most one placeholder exists, it is last, and it exists exactly while awaiting a reply
    #[test]
    fn prop_placeholder_invariant(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut state = EngineState::default();
        for (n, action) in actions.into_iter().enumerate() {
            let before = state.transcript.clone();
            let epoch_before = state.epoch;
            state = step(state, action, n);

            let placeholders = state
                .transcript
                .messages()
                .iter()
                .filter(|m| m.is_placeholder())
                .count();
            prop_assert!(placeholders <= 1);
            if placeholders == 1 {
                prop_assert!(state.transcript.messages().last().is_some_and(Message::is_placeholder));
            }
            let awaiting = matches!(state.phase, Phase::AwaitingReply { .. });
            prop_assert_eq!(placeholders == 1, awaiting);
            if awaiting {
                prop_assert_eq!(state.outstanding_send, Some(state.epoch));
            }

            // Within one binding, confirmed entries are never reordered or dropped
            if state.epoch == epoch_before {
                let stable: Vec<&str> = before
                    .messages()
                    .iter()
                    .filter(|m| !m.is_placeholder())
                    .map(|m| m.id.as_str())
                    .collect();
                let now: Vec<&str> = state
                    .transcript
                    .messages()
                    .iter()
                    .take(stable.len())
                    .map(|m| m.id.as_str())
                    .collect();
                prop_assert_eq!(stable, now);
            }
        }
    }

    /// Binds never open a second request slot: at most one send is unsettled
    #[test]
    fn prop_single_flight_across_binds(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut state = EngineState::default();
        let mut unsettled = 0usize;
        for (n, action) in actions.into_iter().enumerate() {
            let event = to_event(&state, action, n);
            let settles = matches!(event, Event::ReplyReceived { .. } | Event::ReplyFailed { .. });
            if let Ok(result) = transition(&state, &test_context(), event) {
                unsettled += result
                    .effects
                    .iter()
                    .filter(|e| matches!(e, Effect::SendMessage { .. }))
                    .count();
                if settles {
                    unsettled -= 1;
                }
                state = result.new_state;
            }
            prop_assert!(unsettled <= 1);
            prop_assert_eq!(unsettled == 1, state.is_sending());
        }
    }

    /// Whatever happens in between, a history result for an older binding never lands
    #[test]
    fn prop_stale_history_never_applies(
        prefix in proptest::collection::vec(arb_action(), 0..10),
        len_a in 1usize..4,
        len_b in 0usize..4,
    ) {
        let mut state = EngineState::default();
        for (n, action) in prefix.into_iter().enumerate() {
            state = step(state, action, n);
        }

        let a = transition(&state, &test_context(), Event::Bind { session_id: Some("a".to_string()) }).unwrap();
        let epoch_a = a.new_state.epoch;
        let b = transition(&a.new_state, &test_context(), Event::Bind { session_id: Some("b".to_string()) }).unwrap();
        let epoch_b = b.new_state.epoch;

        // B resolves first, then the late A result arrives
        let loaded = transition(&b.new_state, &test_context(), Event::HistoryLoaded {
            epoch: epoch_b,
            session_id: "b".to_string(),
            history: history_of("b", len_b),
        }).unwrap().new_state;
        let late = transition(&loaded, &test_context(), Event::HistoryLoaded {
            epoch: epoch_a,
            session_id: "a".to_string(),
            history: history_of("a", len_a),
        });
        prop_assert_eq!(late.unwrap_err(), TransitionError::StaleResult { epoch: epoch_a });
        prop_assert_eq!(loaded.transcript.messages().len(), len_b);
        prop_assert!(loaded.transcript.messages().iter().all(|m| m.id.starts_with("b-")));

        // And when A arrives first it is discarded as well
        let early = transition(&b.new_state, &test_context(), Event::HistoryLoaded {
            epoch: epoch_a,
            session_id: "a".to_string(),
            history: history_of("a", len_a),
        });
        prop_assert_eq!(early.unwrap_err(), TransitionError::StaleResult { epoch: epoch_a });
    }
}
