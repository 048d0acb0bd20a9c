//! Transcript engine
//!
//! Elm-style pure transitions over the transcript of the active session.
//! The runtime feeds events in and executes the returned effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{EngineContext, EngineState, Message, MessageStatus, Role};
pub use transition::transition;
