//! Tens/ones decomposition for add, sub and mul

use super::{binary_line, show, Advance, Answer, Canon, Cue, MicroStep, Progress, BLANK};
use crate::classifier::{Problem, Unit};
use crate::error::{PlanError, StateError};
use crate::expr::Op;
use crate::numbers::{split_tens, whole_in_range};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithStep {
    Tens,
    Ones,
    Combine,
}

/// `a + b` or `a - b`: tens, then ones, then combine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArithState {
    pub a: i64,
    pub b: i64,
    pub op: Op,
    #[serde(default)]
    pub unit: Option<Unit>,
    pub step: ArithStep,
    /// Confirmed tens result
    #[serde(default)]
    pub tens: Option<i64>,
    /// Confirmed ones result
    #[serde(default)]
    pub ones: Option<i64>,
    #[serde(default)]
    pub progress: Progress,
}

impl ArithState {
    pub fn start(a: i64, b: i64, op: Op, unit: Option<Unit>) -> Result<Self, PlanError> {
        if a < 0 || b < 0 || !whole_in_range(a) || !whole_in_range(b) {
            return Err(PlanError::InvalidOperands);
        }
        if !matches!(op, Op::Add | Op::Sub) {
            return Err(PlanError::InvalidOperands);
        }
        Ok(Self {
            a,
            b,
            op,
            unit,
            step: ArithStep::Tens,
            tens: None,
            ones: None,
            progress: Progress::default(),
        })
    }

    fn combine(&self, left: i64, right: i64) -> i64 {
        match self.op {
            Op::Sub => left - right,
            _ => left + right,
        }
    }

    fn tens_result(&self) -> i64 {
        let (at, _) = split_tens(self.a);
        let (bt, _) = split_tens(self.b);
        self.combine(at, bt)
    }

    fn ones_result(&self) -> i64 {
        let (_, au) = split_tens(self.a);
        let (_, bu) = split_tens(self.b);
        self.combine(au, bu)
    }
}

impl Canon for ArithState {
    fn problem(&self) -> Problem {
        let (a, b, unit) = (self.a, self.b, self.unit);
        match self.op {
            Op::Sub => Problem::Sub { a, b, unit },
            _ => Problem::Add { a, b, unit },
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn micro_step(&self) -> Result<MicroStep, PlanError> {
        let (at, au) = split_tens(self.a);
        let (bt, bu) = split_tens(self.b);
        let step = match self.step {
            ArithStep::Tens => MicroStep::whole(
                Cue::Tens {
                    a: self.a,
                    b: self.b,
                    op: self.op,
                },
                binary_line(at, self.op, bt),
                self.tens_result(),
            ),
            ArithStep::Ones => MicroStep::whole(
                Cue::Ones {
                    round: au == 0 && bu == 0,
                },
                binary_line(au, self.op, bu),
                self.ones_result(),
            ),
            ArithStep::Combine => {
                let tens = self.tens.unwrap_or_else(|| self.tens_result());
                let ones = self.ones.unwrap_or_else(|| self.ones_result());
                // 30 + (-6) reads as 30 - 6
                let line = if ones < 0 {
                    binary_line(tens, Op::Sub, -ones)
                } else {
                    binary_line(tens, Op::Add, ones)
                };
                MicroStep::whole(Cue::Combine, line, self.combine(self.a, self.b))
            }
        };
        Ok(step)
    }

    fn advance(&self) -> Result<Advance<Self>, PlanError> {
        let mut next = self.clone();
        match self.step {
            ArithStep::Tens => {
                next.step = ArithStep::Ones;
                next.tens = Some(self.tens_result());
            }
            ArithStep::Ones => {
                next.step = ArithStep::Combine;
                next.ones = Some(self.ones_result());
            }
            ArithStep::Combine => return self.solution().map(Advance::Done),
        }
        Ok(Advance::Next(next))
    }

    #[allow(clippy::cast_precision_loss)]
    fn solution(&self) -> Result<Answer, PlanError> {
        Ok(Answer::Value {
            value: self.combine(self.a, self.b) as f64,
            unit: self.unit,
        })
    }

    fn transfer(&self) -> Option<Problem> {
        let (a, b, unit) = (self.a + 1, self.b + 1, self.unit);
        Some(match self.op {
            Op::Sub => Problem::Sub { a, b, unit },
            _ => Problem::Add { a, b, unit },
        })
    }

    fn validate(&self) -> Result<(), StateError> {
        let kind = if self.op == Op::Sub { "sub" } else { "add" };
        if self.a < 0 || self.b < 0 {
            return Err(StateError::new(kind, "negative operand"));
        }
        if !whole_in_range(self.a) || !whole_in_range(self.b) {
            return Err(StateError::new(kind, "operand out of range"));
        }
        if !matches!(self.op, Op::Add | Op::Sub) {
            return Err(StateError::new(kind, "operator is not + or -"));
        }
        if self.tens.is_some_and(|t| t != self.tens_result()) {
            return Err(StateError::new(kind, "tens memo does not match operands"));
        }
        if self.ones.is_some_and(|o| o != self.ones_result()) {
            return Err(StateError::new(kind, "ones memo does not match operands"));
        }
        let needs_tens = matches!(self.step, ArithStep::Ones | ArithStep::Combine);
        if needs_tens && self.tens.is_none() {
            return Err(StateError::new(kind, "tens step was never confirmed"));
        }
        if self.step == ArithStep::Combine && self.ones.is_none() {
            return Err(StateError::new(kind, "ones step was never confirmed"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MulStep {
    Split,
    TensPart,
    OnesPart,
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepStage {
    Tens,
    Ones,
    Combine,
}

/// Stuck fallback: split the first factor too, for the pending partial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepSplit {
    pub stage: DeepStage,
    #[serde(default)]
    pub first: Option<i64>,
    #[serde(default)]
    pub second: Option<i64>,
}

/// `x × y`, or an error once the product leaves `i64`
fn product(x: i64, y: i64) -> Result<i64, PlanError> {
    x.checked_mul(y).ok_or(PlanError::InvalidOperands)
}

/// `a × b = a × bT + a × bU`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MulState {
    pub a: i64,
    pub b: i64,
    pub step: MulStep,
    #[serde(default)]
    pub deep: Option<DeepSplit>,
    #[serde(default)]
    pub tens_part: Option<i64>,
    #[serde(default)]
    pub ones_part: Option<i64>,
    #[serde(default)]
    pub progress: Progress,
}

impl MulState {
    pub fn start(a: i64, b: i64) -> Result<Self, PlanError> {
        if a < 0 || b < 0 || !whole_in_range(a) || !whole_in_range(b) {
            return Err(PlanError::InvalidOperands);
        }
        product(a, b)?;
        // Distribute the factor that actually has tens
        let (a, b) = if b < 10 && a >= 10 { (b, a) } else { (a, b) };
        Ok(Self {
            a,
            b,
            step: MulStep::Split,
            deep: None,
            tens_part: None,
            ones_part: None,
            progress: Progress::default(),
        })
    }

    /// The part of `b` the pending partial step multiplies by
    fn pending_part(&self) -> Option<i64> {
        let (bt, bu) = split_tens(self.b);
        match self.step {
            MulStep::TensPart => Some(bt),
            MulStep::OnesPart => Some(bu),
            MulStep::Split | MulStep::Sum => None,
        }
    }

    fn deep_step(&self, deep: DeepSplit, part: i64) -> Result<MicroStep, PlanError> {
        let (at, au) = split_tens(self.a);
        let step = match deep.stage {
            DeepStage::Tens => MicroStep::whole(
                Cue::SplitPartial {
                    part,
                    factor: self.a,
                },
                binary_line(at, Op::Mul, part),
                product(at, part)?,
            ),
            DeepStage::Ones => MicroStep::whole(
                Cue::SplitPartial {
                    part,
                    factor: self.a,
                },
                binary_line(au, Op::Mul, part),
                product(au, part)?,
            ),
            DeepStage::Combine => MicroStep::whole(
                Cue::SumPartials,
                binary_line(
                    deep.first.map_or_else(|| product(at, part), Ok)?,
                    Op::Add,
                    deep.second.map_or_else(|| product(au, part), Ok)?,
                ),
                product(self.a, part)?,
            ),
        };
        Ok(step)
    }

    /// Past a partial step, whether answered directly or via the deep split
    fn after_partial(&self) -> Result<Self, PlanError> {
        let (bt, bu) = split_tens(self.b);
        let mut next = self.clone();
        next.deep = None;
        match self.step {
            MulStep::TensPart => {
                next.tens_part = Some(product(self.a, bt)?);
                next.step = MulStep::OnesPart;
            }
            _ => {
                next.ones_part = Some(product(self.a, bu)?);
                next.step = MulStep::Sum;
            }
        }
        Ok(next)
    }
}

impl Canon for MulState {
    fn problem(&self) -> Problem {
        Problem::Mul {
            a: self.a,
            b: self.b,
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn micro_step(&self) -> Result<MicroStep, PlanError> {
        let (bt, bu) = split_tens(self.b);
        if let (Some(deep), Some(part)) = (self.deep, self.pending_part()) {
            return self.deep_step(deep, part);
        }
        let step = match self.step {
            MulStep::Split => MicroStep::whole(
                Cue::SplitFactor { factor: self.b },
                format!("{} = {} + {BLANK}", show(self.b), show(bt)),
                bu,
            ),
            MulStep::TensPart => MicroStep::whole(
                Cue::Partial {
                    part: bt,
                    factor: self.a,
                },
                binary_line(self.a, Op::Mul, bt),
                product(self.a, bt)?,
            ),
            MulStep::OnesPart => MicroStep::whole(
                Cue::Partial {
                    part: bu,
                    factor: self.a,
                },
                binary_line(self.a, Op::Mul, bu),
                product(self.a, bu)?,
            ),
            MulStep::Sum => MicroStep::whole(
                Cue::SumPartials,
                binary_line(
                    self.tens_part.map_or_else(|| product(self.a, bt), Ok)?,
                    Op::Add,
                    self.ones_part.map_or_else(|| product(self.a, bu), Ok)?,
                ),
                product(self.a, self.b)?,
            ),
        };
        Ok(step)
    }

    fn advance(&self) -> Result<Advance<Self>, PlanError> {
        if let (Some(deep), Some(part)) = (self.deep, self.pending_part()) {
            let (at, au) = split_tens(self.a);
            let mut next = self.clone();
            next.deep = Some(match deep.stage {
                DeepStage::Tens => DeepSplit {
                    stage: DeepStage::Ones,
                    first: Some(product(at, part)?),
                    second: None,
                },
                DeepStage::Ones => DeepSplit {
                    stage: DeepStage::Combine,
                    second: Some(product(au, part)?),
                    ..deep
                },
                DeepStage::Combine => return self.after_partial().map(Advance::Next),
            });
            return Ok(Advance::Next(next));
        }

        match self.step {
            MulStep::Split => {
                let mut next = self.clone();
                next.step = MulStep::TensPart;
                Ok(Advance::Next(next))
            }
            MulStep::TensPart | MulStep::OnesPart => self.after_partial().map(Advance::Next),
            MulStep::Sum => self.solution().map(Advance::Done),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn solution(&self) -> Result<Answer, PlanError> {
        let value = product(self.a, self.b)?;
        Ok(Answer::Value {
            value: value as f64,
            unit: None,
        })
    }

    fn transfer(&self) -> Option<Problem> {
        Some(Problem::Mul {
            a: self.a + 1,
            b: self.b,
        })
    }

    fn validate(&self) -> Result<(), StateError> {
        let (bt, bu) = split_tens(self.b);
        if self.a < 0 || self.b < 0 {
            return Err(StateError::new("mul", "negative operand"));
        }
        if !whole_in_range(self.a)
            || !whole_in_range(self.b)
            || self.a.checked_mul(self.b).is_none()
        {
            return Err(StateError::new("mul", "operand out of range"));
        }
        if self.tens_part.is_some_and(|p| Some(p) != self.a.checked_mul(bt)) {
            return Err(StateError::new("mul", "tens partial does not match operands"));
        }
        if self.ones_part.is_some_and(|p| Some(p) != self.a.checked_mul(bu)) {
            return Err(StateError::new("mul", "ones partial does not match operands"));
        }
        let needs_tens = matches!(self.step, MulStep::OnesPart | MulStep::Sum);
        if needs_tens && self.tens_part.is_none() {
            return Err(StateError::new("mul", "tens partial was never confirmed"));
        }
        if self.step == MulStep::Sum && self.ones_part.is_none() {
            return Err(StateError::new("mul", "ones partial was never confirmed"));
        }
        if self.deep.is_some() && self.pending_part().is_none() {
            return Err(StateError::new("mul", "deep split outside a partial step"));
        }
        Ok(())
    }

    fn deepen(&self) -> Option<Self> {
        let (at, au) = split_tens(self.a);
        if self.deep.is_some() || self.pending_part().is_none() || at == 0 || au == 0 {
            return None;
        }
        let mut next = self.clone();
        next.deep = Some(DeepSplit {
            stage: DeepStage::Tens,
            first: None,
            second: None,
        });
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines<S: Canon>(mut state: S) -> Vec<String> {
        let mut out = Vec::new();
        loop {
            out.push(state.micro_step().unwrap().line);
            match state.advance().unwrap() {
                Advance::Next(next) => state = next,
                Advance::Done(_) => return out,
            }
        }
    }

    #[test]
    fn test_add_tens_ones_combine() {
        let state = ArithState::start(47, 28, Op::Add, None).unwrap();
        assert_eq!(lines(state), vec!["40 + 20 = __", "7 + 8 = __", "60 + 15 = __"]);
    }

    #[test]
    fn test_sub_with_negative_ones() {
        let state = ArithState::start(52, 28, Op::Sub, None).unwrap();
        assert_eq!(lines(state), vec!["50 − 20 = __", "2 − 8 = __", "30 − 6 = __"]);
    }

    #[test]
    fn test_add_solution_keeps_unit() {
        let state = ArithState::start(3000, 250, Op::Add, Some(Unit::Gram)).unwrap();
        assert_eq!(
            state.solution().unwrap(),
            Answer::Value {
                value: 3250.0,
                unit: Some(Unit::Gram)
            }
        );
    }

    #[test]
    fn test_mul_default_path() {
        let state = MulState::start(23, 14).unwrap();
        assert_eq!(
            lines(state),
            vec!["14 = 10 + __", "23 × 10 = __", "23 × 4 = __", "230 + 92 = __"]
        );
    }

    #[test]
    fn test_mul_swaps_single_digit_second_factor() {
        let state = MulState::start(23, 7).unwrap();
        assert_eq!((state.a, state.b), (7, 23));
    }

    #[test]
    fn test_mul_deep_split_is_bounded() {
        let mut state = MulState::start(23, 14).unwrap();
        assert!(state.deepen().is_none(), "no partial pending yet");
        state = match state.advance().unwrap() {
            Advance::Next(next) => next,
            Advance::Done(_) => unreachable!(),
        };
        let deep = state.deepen().unwrap();
        assert!(deep.deepen().is_none());
        assert_eq!(
            lines(deep),
            vec![
                "20 × 10 = __",
                "3 × 10 = __",
                "200 + 30 = __",
                "23 × 4 = __",
                "230 + 92 = __"
            ]
        );
    }

    #[test]
    fn test_mul_rejects_product_beyond_i64() {
        assert_eq!(
            MulState::start(999_999_999_999, 999_999_999_999),
            Err(PlanError::InvalidOperands)
        );
        let mut state = MulState::start(23, 14).unwrap();
        state.a = 999_999_999_999;
        state.b = 999_999_999_999;
        state.step = MulStep::TensPart;
        assert!(state.validate().is_err());
        assert_eq!(state.micro_step(), Err(PlanError::InvalidOperands));
    }

    #[test]
    fn test_arith_rejects_out_of_range_operands() {
        assert!(ArithState::start(i64::MAX, 1, Op::Add, None).is_err());
        let mut state = ArithState::start(47, 28, Op::Add, None).unwrap();
        state.a = i64::MAX;
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inconsistent_memo() {
        let mut state = ArithState::start(47, 28, Op::Add, None).unwrap();
        state.step = ArithStep::Combine;
        assert!(state.validate().is_err());
        state.tens = Some(60);
        state.ones = Some(16);
        assert!(state.validate().is_err());
        state.ones = Some(15);
        assert!(state.validate().is_ok());
    }
}
