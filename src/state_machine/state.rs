//! Conversation state types

use crate::classifier::Problem;
use crate::error::{PlanError, StateError};
use crate::expr::Op;
use crate::planner::{
    Advance, Answer, ArithState, Canon, DivState, ExprState, FracState, MicroStep, MulState,
    PercentState, Progress, UnknownState,
};
use serde::{Deserialize, Serialize};

/// In-flight tutoring state, one variant per skill.
///
/// The caller stores this between turns and hands it back unchanged; the
/// engine never mutates it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationState {
    Add(ArithState),
    Sub(ArithState),
    Mul(MulState),
    Div(DivState),
    Frac(FracState),
    Percent(PercentState),
    OrderOps(ExprState),
    Negatives(ExprState),
    Unknown(UnknownState),
}

/// Run `$body` with `$s` bound to the skill state, whatever the variant
macro_rules! with_skill {
    ($state:expr, $s:ident => $body:expr) => {
        match $state {
            ConversationState::Add($s) | ConversationState::Sub($s) => $body,
            ConversationState::Mul($s) => $body,
            ConversationState::Div($s) => $body,
            ConversationState::Frac($s) => $body,
            ConversationState::Percent($s) => $body,
            ConversationState::OrderOps($s) | ConversationState::Negatives($s) => $body,
            ConversationState::Unknown($s) => $body,
        }
    };
}

impl ConversationState {
    /// Initial state for a freshly classified problem
    pub fn start(problem: &Problem) -> Result<Self, PlanError> {
        let state = match problem {
            Problem::Add { a, b, unit } => Self::Add(ArithState::start(*a, *b, Op::Add, *unit)?),
            Problem::Sub { a, b, unit } => Self::Sub(ArithState::start(*a, *b, Op::Sub, *unit)?),
            Problem::Mul { a, b } => Self::Mul(MulState::start(*a, *b)?),
            Problem::Div { a, b } => Self::Div(DivState::start(*a, *b)?),
            Problem::Frac {
                numerator,
                denominator,
            } => Self::Frac(FracState::start(*numerator, *denominator)?),
            Problem::Percent { percent, base } => {
                Self::Percent(PercentState::start(*percent, *base)?)
            }
            Problem::OrderOps { expr } => Self::OrderOps(ExprState::start(expr, false)?),
            Problem::Negatives { expr } => Self::Negatives(ExprState::start(expr, true)?),
            Problem::Unknown {
                op,
                known,
                result,
                blank_first,
            } => Self::Unknown(UnknownState::start(*op, *known, *result, *blank_first)?),
        };
        Ok(state)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Sub(_) => "sub",
            Self::Mul(_) => "mul",
            Self::Div(_) => "div",
            Self::Frac(_) => "frac",
            Self::Percent(_) => "percent",
            Self::OrderOps(_) => "order_ops",
            Self::Negatives(_) => "negatives",
            Self::Unknown(_) => "unknown",
        }
    }

    pub fn problem(&self) -> Problem {
        with_skill!(self, s => s.problem())
    }

    pub fn progress(&self) -> Progress {
        with_skill!(self, s => s.progress())
    }

    pub fn progress_mut(&mut self) -> &mut Progress {
        with_skill!(self, s => s.progress_mut())
    }

    pub fn micro_step(&self) -> Result<MicroStep, PlanError> {
        with_skill!(self, s => s.micro_step())
    }

    pub fn solution(&self) -> Result<Answer, PlanError> {
        with_skill!(self, s => s.solution())
    }

    pub fn transfer(&self) -> Option<Problem> {
        with_skill!(self, s => s.transfer())
    }

    /// Move past the pending step, keeping the variant
    pub fn advance(&self) -> Result<Advance<Self>, PlanError> {
        let next = match self {
            Self::Add(s) => s.advance()?.map(Self::Add),
            Self::Sub(s) => s.advance()?.map(Self::Sub),
            Self::Mul(s) => s.advance()?.map(Self::Mul),
            Self::Div(s) => s.advance()?.map(Self::Div),
            Self::Frac(s) => s.advance()?.map(Self::Frac),
            Self::Percent(s) => s.advance()?.map(Self::Percent),
            Self::OrderOps(s) => s.advance()?.map(Self::OrderOps),
            Self::Negatives(s) => s.advance()?.map(Self::Negatives),
            Self::Unknown(s) => s.advance()?.map(Self::Unknown),
        };
        Ok(next)
    }

    /// Finer-grained fallback for the pending step, if the skill has one
    pub fn deepen(&self) -> Option<Self> {
        match self {
            Self::Mul(s) => s.deepen().map(Self::Mul),
            _ => None,
        }
    }

    /// Check a carried state before resuming it.
    pub fn validate(&self) -> Result<(), StateError> {
        let tag_matches = match self {
            Self::Add(s) => s.op == Op::Add,
            Self::Sub(s) => s.op == Op::Sub,
            Self::OrderOps(s) => !s.negatives,
            Self::Negatives(s) => s.negatives,
            _ => true,
        };
        if !tag_matches {
            return Err(StateError::new(self.kind(), "variant does not match its payload"));
        }
        with_skill!(self, s => s.validate())?;
        // The pending step must be derivable
        self.micro_step()
            .map(|_| ())
            .map_err(|e| StateError::new(self.kind(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    #[test]
    fn test_start_every_kind() {
        for text in [
            "47 + 28",
            "52 - 28",
            "23 * 14",
            "184 / 16",
            "simplify 12/18",
            "25% of 80",
            "3 + 4 * 2",
            "-7 + 12",
            "__ + 5 = 12",
        ] {
            let problem = classify(text).unwrap();
            let state = ConversationState::start(&problem).unwrap();
            assert_eq!(state.kind(), problem.kind(), "{text}");
            assert_eq!(state.problem().kind(), problem.kind());
            state.validate().unwrap();
        }
    }

    #[test]
    fn test_serde_round_trip_keeps_kind_tag() {
        let state = ConversationState::start(&Problem::Div { a: 184, b: 16 }).unwrap();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["kind"], "div");
        assert_eq!(json["step"], "bx_start");
        let back: ConversationState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_missing_progress_defaults() {
        let json = serde_json::json!({
            "kind": "add", "a": 47, "b": 28, "op": "add", "step": "tens"
        });
        let state: ConversationState = serde_json::from_value(json).unwrap();
        assert_eq!(state.progress(), Progress::default());
        state.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_mismatched_tag() {
        let json = serde_json::json!({
            "kind": "sub", "a": 47, "b": 28, "op": "add", "step": "tens"
        });
        let state: ConversationState = serde_json::from_value(json).unwrap();
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_divisor() {
        let json = serde_json::json!({
            "kind": "div", "a": 10, "b": 0, "step": "bx_start", "remainder": 10, "chunk": 1
        });
        let state: ConversationState = serde_json::from_value(json).unwrap();
        assert!(state.validate().is_err());
    }
}
