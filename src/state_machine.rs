//! Core conversation state machine
//!
//! Elm-style: a pure `transition` from (state, student input) to a new state
//! plus a list of effects for the coach to render.

mod effect;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use state::ConversationState;
pub use transition::{open, transition, TransitionResult};
