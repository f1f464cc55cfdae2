//! Canonical step planner
//!
//! One module per skill family. Each skill keeps its own state struct and
//! implements [`Canon`]: the current micro-step, how to move past it once the
//! learner has produced the expected value, the full solution (for the
//! escape hatch) and an adjacent transfer problem.
//!
//! The planner never looks at learner text. Answer checking and stuck
//! handling live in the state machine.

mod arith;
mod division;
mod expression;
mod fraction;
mod percent;
mod unknown;

pub use arith::{ArithState, ArithStep, DeepSplit, DeepStage, MulState, MulStep};
pub use division::{DivState, DivStep};
pub use expression::{ExprState, Scope, SignRewrite};
pub use fraction::{FracState, FracStep, TRIAL_DIVISORS};
pub use percent::{PercentPlan, PercentState, PercentStep};
pub use unknown::UnknownState;

use crate::classifier::{Problem, Unit};
use crate::error::{PlanError, StateError};
use crate::expr::Op;
use crate::numbers::display_number;
use serde::{Deserialize, Serialize};

/// The one fillable blank in every prompt
pub const BLANK: &str = "__";

/// Per-state counters shared by every skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Validated answers so far; never decreases
    pub turn: u32,
    /// Stuck signals on the current step
    pub stuck: u32,
    /// Non-advancing replies on the current step (wrong answers, acks)
    pub misses: u32,
}

impl Progress {
    /// Counters after a validated answer
    pub fn advanced(self) -> Self {
        Self {
            turn: self.turn + 1,
            stuck: 0,
            misses: 0,
        }
    }
}

/// What a micro-step is about, for the coach to narrate
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    /// add/sub: tens of both operands
    Tens { a: i64, b: i64, op: Op },
    /// `round`: both operands are whole tens
    Ones { round: bool },
    /// add/sub: tens result with ones result
    Combine,
    /// mul: split the second factor into tens and ones
    SplitFactor { factor: i64 },
    /// mul: the whole first factor times one part
    Partial { part: i64, factor: i64 },
    /// mul, stuck fallback: one part of the first factor times `part`
    SplitPartial { part: i64, factor: i64 },
    SumPartials,
    /// div: how much `chunk` groups of the divisor take
    Chunk { divisor: i64, remaining: i64 },
    /// div: take the chunk away from what is left
    TakeAway,
    QuotientSum,
    /// div: dividend smaller than divisor
    WholeTimes,
    /// frac: divide the numerator
    DivideTop { divisor: i64 },
    DivideBottom { divisor: i64 },
    /// percent: exact shortcut (50% is half, ...)
    PercentShortcut { percent: f64, divisor: i64 },
    /// percent: find 10% or 1% first
    PercentUnit { percent_unit: i64 },
    /// percent: scale the unit part up
    PercentScale { factor: f64 },
    /// order_ops/negatives: one reduction of `expression`
    Reduce {
        expression: String,
        scope: Scope,
        rewrite: Option<SignRewrite>,
    },
    /// unknown: undo the operation
    Inverse { equation: String },
}

/// One atomic computation with exactly one blank
#[derive(Debug, Clone, PartialEq)]
pub struct MicroStep {
    pub cue: Cue,
    /// `40 + 20 = __`
    pub line: String,
    pub expected: f64,
}

impl MicroStep {
    #[allow(clippy::cast_precision_loss)]
    pub fn whole(cue: Cue, line: String, expected: i64) -> Self {
        Self {
            cue,
            line,
            expected: expected as f64,
        }
    }

    /// The line with the blank filled in: `40 + 20 = 60`
    pub fn filled(&self) -> String {
        self.line.replacen(BLANK, &display_number(self.expected), 1)
    }
}

/// Outcome of moving past a step
#[derive(Debug, Clone, PartialEq)]
pub enum Advance<S> {
    Next(S),
    Done(Answer),
}

impl<S> Advance<S> {
    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Advance<T> {
        match self {
            Advance::Next(state) => Advance::Next(f(state)),
            Advance::Done(answer) => Advance::Done(answer),
        }
    }
}

/// A fully worked result
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Value {
        value: f64,
        unit: Option<Unit>,
    },
    Division {
        dividend: i64,
        divisor: i64,
        quotient: i64,
        remainder: i64,
    },
    Fraction {
        numerator: i64,
        denominator: i64,
    },
    /// unknown: the missing number and the completed equation
    Missing {
        value: i64,
        equation: String,
    },
}

/// A skill's canonical decomposition
pub trait Canon: Sized {
    /// The problem this state is working on, as first classified
    fn problem(&self) -> Problem;

    fn progress(&self) -> Progress;

    fn progress_mut(&mut self) -> &mut Progress;

    /// The pending micro-step
    fn micro_step(&self) -> Result<MicroStep, PlanError>;

    /// Move past the pending step; the caller has already checked the answer.
    fn advance(&self) -> Result<Advance<Self>, PlanError>;

    /// The whole answer, computed directly
    fn solution(&self) -> Result<Answer, PlanError>;

    /// An adjacent problem of the same kind, if the skill has one
    fn transfer(&self) -> Option<Problem>;

    /// Reject carried states whose memos contradict their operands.
    fn validate(&self) -> Result<(), StateError>;

    /// A finer-grained variant of the pending step, offered when the
    /// learner is stuck. At most one level deep.
    fn deepen(&self) -> Option<Self> {
        None
    }
}

/// `a + b = __` with a learner-facing minus for negatives
pub(crate) fn binary_line(left: i64, op: Op, right: i64) -> String {
    format!("{} {} {} = {BLANK}", show(left), op.symbol(), show_operand(right))
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn show(value: i64) -> String {
    display_number(value as f64)
}

/// Negative right-hand operands go in parentheses: `5 − (−3)`
pub(crate) fn show_operand(value: i64) -> String {
    if value < 0 {
        format!("({})", show(value))
    } else {
        show(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_replaces_the_blank() {
        let step = MicroStep::whole(Cue::Ones { round: false }, binary_line(7, Op::Add, 8), 15);
        assert_eq!(step.line, "7 + 8 = __");
        assert_eq!(step.filled(), "7 + 8 = 15");
    }

    #[test]
    fn test_negative_operands_display() {
        assert_eq!(binary_line(2, Op::Sub, 8), "2 − 8 = __");
        assert_eq!(binary_line(-3, Op::Mul, -2), "−3 × (−2) = __");
    }

    #[test]
    fn test_progress_advanced_resets_counters() {
        let p = Progress {
            turn: 2,
            stuck: 3,
            misses: 1,
        };
        assert_eq!(
            p.advanced(),
            Progress {
                turn: 3,
                stuck: 0,
                misses: 0
            }
        );
    }
}
