//! Missing-term equations: `__ + 5 = 12`, `7 - __ = 3`

use super::{binary_line, show, Advance, Answer, Canon, Cue, MicroStep, Progress};
use crate::classifier::Problem;
use crate::error::{PlanError, StateError};
use crate::expr::Op;
use crate::numbers::whole_in_range;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownState {
    pub op: Op,
    pub known: i64,
    pub result: i64,
    /// `__ op known = result` rather than `known op __ = result`
    pub blank_first: bool,
    #[serde(default)]
    pub progress: Progress,
}

impl UnknownState {
    pub fn start(op: Op, known: i64, result: i64, blank_first: bool) -> Result<Self, PlanError> {
        if !matches!(op, Op::Add | Op::Sub) {
            return Err(PlanError::Unsupported);
        }
        if !whole_in_range(known) || !whole_in_range(result) {
            return Err(PlanError::InvalidOperands);
        }
        Ok(Self {
            op,
            known,
            result,
            blank_first,
            progress: Progress::default(),
        })
    }

    /// The inverse computation that yields the missing term
    fn inverse(&self) -> (i64, Op, i64) {
        match (self.op, self.blank_first) {
            // __ - k = r  ->  r + k
            (Op::Sub, true) => (self.result, Op::Add, self.known),
            // k - __ = r  ->  k - r
            (Op::Sub, false) => (self.known, Op::Sub, self.result),
            // __ + k = r, k + __ = r  ->  r - k
            _ => (self.result, Op::Sub, self.known),
        }
    }

    fn missing(&self) -> i64 {
        match self.inverse() {
            (l, Op::Add, r) => l + r,
            (l, _, r) => l - r,
        }
    }

    fn equation(&self, missing: &str) -> String {
        let known = show(self.known);
        let (left, right) = if self.blank_first {
            (missing.to_string(), known)
        } else {
            (known, missing.to_string())
        };
        format!("{left} {} {right} = {}", self.op.symbol(), show(self.result))
    }
}

impl Canon for UnknownState {
    fn problem(&self) -> Problem {
        Problem::Unknown {
            op: self.op,
            known: self.known,
            result: self.result,
            blank_first: self.blank_first,
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn micro_step(&self) -> Result<MicroStep, PlanError> {
        let (left, op, right) = self.inverse();
        Ok(MicroStep::whole(
            Cue::Inverse {
                equation: self.equation("?"),
            },
            binary_line(left, op, right),
            self.missing(),
        ))
    }

    fn advance(&self) -> Result<Advance<Self>, PlanError> {
        self.solution().map(Advance::Done)
    }

    fn solution(&self) -> Result<Answer, PlanError> {
        let value = self.missing();
        Ok(Answer::Missing {
            value,
            equation: self.equation(&show(value)),
        })
    }

    fn transfer(&self) -> Option<Problem> {
        Some(Problem::Unknown {
            op: self.op,
            known: self.known,
            result: self.result + 1,
            blank_first: self.blank_first,
        })
    }

    fn validate(&self) -> Result<(), StateError> {
        if !matches!(self.op, Op::Add | Op::Sub) {
            return Err(StateError::new("unknown", "operator is not + or -"));
        }
        if !whole_in_range(self.known) || !whole_in_range(self.result) {
            return Err(StateError::new("unknown", "term out of range"));
        }
        Ok(())
    }
}
