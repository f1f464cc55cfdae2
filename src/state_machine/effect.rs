//! What a transition asks the coach to say

use crate::classifier::Problem;
use crate::planner::{Answer, Cue, MicroStep};

/// One piece of the reply, rendered in order by the coach.
///
/// Transitions never produce text themselves; the same effect list renders
/// differently per language and age band.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A fresh problem was recognized
    Intro { problem: Problem },
    /// The pending micro-step; always the last effect of a non-terminal reply
    Prompt(MicroStep),
    /// The previous step was answered correctly
    Confirm { filled: String },
    /// Wrong answer; `attempt` rotates the wording
    Retry { attempt: u32 },
    /// Ack, yes/no or unrelated text while a step is pending
    Restate { attempt: u32 },
    /// First stuck signal on a step
    Reminder { cue: Cue },
    /// Second and third stuck signal; `deeper` when the step was split further
    Together {
        cue: Cue,
        deeper: bool,
        attempt: u32,
    },
    /// Escape hatch: the whole answer of the current problem
    Reveal { problem: Problem, answer: Answer },
    /// Escape hatch: a similar problem to try next
    Transfer { problem: Problem },
    /// Terminal step answered
    Solved {
        problem: Problem,
        answer: Answer,
        turn: u32,
    },
}

impl Effect {
    pub fn prompt(step: MicroStep) -> Self {
        Effect::Prompt(step)
    }

    pub fn confirm(step: &MicroStep) -> Self {
        Effect::Confirm {
            filled: step.filled(),
        }
    }

    /// Whether this effect leaves a question pending
    pub fn is_prompt(&self) -> bool {
        matches!(self, Effect::Prompt(_))
    }
}
