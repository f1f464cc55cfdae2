//! Microstep Tutor - deterministic tutoring-dialogue engine
//!
//! Turns a learner's free text into exactly one atomic computation per turn
//! for a fixed catalogue of arithmetic skills, and keeps upstream model
//! replies in line with that protocol.

#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation,
    clippy::return_self_not_must_use
)]

pub mod classifier;
pub mod coach;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod language;
pub mod lexicon;
pub mod numbers;
pub mod planner;
pub mod policy;
pub mod state_machine;

pub use config::EngineConfig;
pub use engine::{Action, Engine, ReviewRequest, ReviewedReply, TurnRequest, TurnResponse};
pub use state_machine::ConversationState;
