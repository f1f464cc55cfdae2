//! tutor-session - line-oriented driver for the tutoring engine
//!
//! Reads one learner message per stdin line and prints the engine's reply,
//! or `[upstream]` when the engine leaves the turn to the upstream model.
//! `/state` prints the carried state as JSON.

use microstep_tutor::{ConversationState, Engine, EngineConfig, TurnRequest};
use std::io::{self, BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "microstep_tutor=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(io::stderr),
        )
        .init();

    let config = EngineConfig::from_env();
    let language = config.default_language.to_string();
    let age = config.default_age;
    tracing::info!(%language, age, "Starting tutor session");
    let engine = Engine::new(config);

    let mut state: Option<ConversationState> = None;
    let mut last_message: Option<String> = None;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in io::stdin().lock().lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/state" {
            writeln!(out, "{}", serde_json::to_string_pretty(&state)?)?;
            continue;
        }

        let response = engine.handle_turn(&TurnRequest {
            prior_state: state.take(),
            last_user_text: text.to_string(),
            age,
            language: language.clone(),
            last_assistant_message: last_message.clone(),
        });
        state = response.next_state;
        match response.message {
            Some(message) => {
                writeln!(out, "{message}")?;
                last_message = Some(message);
            }
            None => writeln!(out, "[upstream]")?,
        }
        writeln!(out)?;
        out.flush()?;
    }
    Ok(())
}
