//! Pure state transition function
//!
//! Given the carried state and the classified student reply, produce the
//! next state and the effects the coach should render. No I/O, no clock,
//! no randomness: the same inputs always give the same result.

use super::{ConversationState, Effect};
use crate::classifier::{Problem, StudentInput};
use crate::error::PlanError;
use crate::numbers::matches_expected;
use crate::planner::Advance;

/// Stuck signals up to this count get a "together" framing; beyond it the
/// answer is revealed.
const MAX_GUIDED_STUCK: u32 = 3;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    /// `None` once the problem is solved, revealed without transfer or stopped
    pub new_state: Option<ConversationState>,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Option<ConversationState>) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Whether the reply ends on a pending micro-step
    pub fn awaits_answer(&self) -> bool {
        self.effects.last().is_some_and(Effect::is_prompt)
    }
}

/// Start tutoring a freshly classified problem.
pub fn open(problem: &Problem) -> Result<TransitionResult, PlanError> {
    let state = ConversationState::start(problem)?;
    let step = state.micro_step()?;
    Ok(TransitionResult::new(Some(state))
        .with_effect(Effect::Intro {
            problem: problem.clone(),
        })
        .with_effect(Effect::prompt(step)))
}

/// Pure transition function
pub fn transition(
    state: &ConversationState,
    input: StudentInput,
) -> Result<TransitionResult, PlanError> {
    let step = state.micro_step()?;

    match input {
        // Correct answer: confirm and move on, or finish
        StudentInput::Answer(value) if matches_expected(value, step.expected) => {
            let turn = state.progress().turn + 1;
            match state.advance()? {
                Advance::Next(mut next) => {
                    let progress = next.progress_mut();
                    *progress = progress.advanced();
                    let next_step = next.micro_step()?;
                    Ok(TransitionResult::new(Some(next))
                        .with_effect(Effect::confirm(&step))
                        .with_effect(Effect::prompt(next_step)))
                }
                Advance::Done(answer) => Ok(TransitionResult::new(None)
                    .with_effect(Effect::confirm(&step))
                    .with_effect(Effect::Solved {
                        problem: state.problem(),
                        answer,
                        turn,
                    })),
            }
        }

        // Wrong answer: same step, same prompt
        StudentInput::Answer(_) => {
            let mut next = state.clone();
            next.progress_mut().misses += 1;
            let attempt = next.progress().misses;
            Ok(TransitionResult::new(Some(next))
                .with_effect(Effect::Retry { attempt })
                .with_effect(Effect::prompt(step)))
        }

        StudentInput::Stuck => stuck(state, step),

        StudentInput::Ack | StudentInput::YesNo | StudentInput::Other => {
            let mut next = state.clone();
            next.progress_mut().misses += 1;
            let attempt = next.progress().misses;
            Ok(TransitionResult::new(Some(next))
                .with_effect(Effect::Restate { attempt })
                .with_effect(Effect::prompt(step)))
        }
    }
}

/// Escape hatch: reminder, then together, then reveal with a transfer problem.
fn stuck(
    state: &ConversationState,
    step: crate::planner::MicroStep,
) -> Result<TransitionResult, PlanError> {
    let mut next = state.clone();
    next.progress_mut().stuck += 1;
    let count = next.progress().stuck;

    if count == 1 {
        return Ok(TransitionResult::new(Some(next))
            .with_effect(Effect::Reminder {
                cue: step.cue.clone(),
            })
            .with_effect(Effect::prompt(step)));
    }

    if count <= MAX_GUIDED_STUCK {
        if let Some(deeper) = next.deepen() {
            let deep_step = deeper.micro_step()?;
            return Ok(TransitionResult::new(Some(deeper))
                .with_effect(Effect::Together {
                    cue: step.cue,
                    deeper: true,
                    attempt: count,
                })
                .with_effect(Effect::prompt(deep_step)));
        }
        return Ok(TransitionResult::new(Some(next))
            .with_effect(Effect::Together {
                cue: step.cue.clone(),
                deeper: false,
                attempt: count,
            })
            .with_effect(Effect::prompt(step)));
    }

    let reveal = Effect::Reveal {
        problem: state.problem(),
        answer: state.solution()?,
    };
    // A transfer problem that cannot be planned just ends the session
    let transfer = state
        .transfer()
        .and_then(|problem| open(&problem).ok().map(|opened| (problem, opened)));
    match transfer {
        Some((problem, opened)) => {
            let prompt = opened.effects.into_iter().filter(Effect::is_prompt);
            Ok(TransitionResult::new(opened.new_state)
                .with_effect(reveal)
                .with_effect(Effect::Transfer { problem })
                .with_effects(prompt))
        }
        None => Ok(TransitionResult::new(None).with_effect(reveal)),
    }
}
