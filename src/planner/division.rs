//! Chunked long division
//!
//! Take away `chunk × b` from what is left, where `chunk` is 1 while the
//! remaining quotient is below 10 and otherwise its leading digit at its
//! place value (10 for 10..19, 300 for 300..399). Then add the chunks up.

use super::{binary_line, show, Advance, Answer, Canon, Cue, MicroStep, Progress, BLANK};
use crate::classifier::Problem;
use crate::error::{PlanError, StateError};
use crate::expr::Op;
use crate::numbers::whole_in_range;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivStep {
    /// First chunk product: `b × chunk`
    BxStart,
    /// `a − b × chunk`
    AMinusUsed,
    /// Later chunk products
    BxNext,
    /// `remainder − b × chunk`
    RemMinusChunk,
    /// Add the chunks into the quotient
    QSum,
    /// `a < b`: the divisor fits zero whole times
    WholeTimes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivState {
    pub a: i64,
    pub b: i64,
    pub step: DivStep,
    /// What is left of `a` after the confirmed chunks
    pub remainder: i64,
    /// Chunk pending in the current product/subtract pair
    pub chunk: i64,
    /// Confirmed chunks, in order
    #[serde(default)]
    pub parts: Vec<i64>,
    #[serde(default)]
    pub progress: Progress,
}

/// Leading digit of `n` at its place value
fn leading_chunk(n: i64) -> i64 {
    let mut place = 1;
    while n / place >= 10 {
        place *= 10;
    }
    (n / place) * place
}

/// Chunk for a remaining quotient of `q`; single ones below ten
fn next_chunk(q: i64) -> i64 {
    if q < 10 {
        1
    } else {
        leading_chunk(q)
    }
}

impl DivState {
    pub fn start(a: i64, b: i64) -> Result<Self, PlanError> {
        if a < 0 || b <= 0 || !whole_in_range(a) || !whole_in_range(b) {
            return Err(PlanError::InvalidOperands);
        }
        let (step, chunk) = if a < b {
            (DivStep::WholeTimes, 0)
        } else {
            (DivStep::BxStart, next_chunk(a / b))
        };
        Ok(Self {
            a,
            b,
            step,
            remainder: a,
            chunk,
            parts: Vec::new(),
            progress: Progress::default(),
        })
    }

    /// Sum of the confirmed chunks, `None` on overflow
    fn quotient(&self) -> Option<i64> {
        self.parts.iter().try_fold(0_i64, |sum, part| sum.checked_add(*part))
    }

    fn used(&self) -> Result<i64, PlanError> {
        self.b
            .checked_mul(self.chunk)
            .ok_or(PlanError::InvalidOperands)
    }
}

impl Canon for DivState {
    fn problem(&self) -> Problem {
        Problem::Div {
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
        let used = self.used()?;
        let step = match self.step {
            DivStep::BxStart | DivStep::BxNext => MicroStep::whole(
                Cue::Chunk {
                    divisor: self.b,
                    remaining: self.remainder,
                },
                binary_line(self.b, Op::Mul, self.chunk),
                used,
            ),
            DivStep::AMinusUsed | DivStep::RemMinusChunk => MicroStep::whole(
                Cue::TakeAway,
                binary_line(self.remainder, Op::Sub, used),
                self.remainder
                    .checked_sub(used)
                    .ok_or(PlanError::InvalidOperands)?,
            ),
            DivStep::QSum => {
                let terms: Vec<String> = self.parts.iter().map(|p| show(*p)).collect();
                MicroStep::whole(
                    Cue::QuotientSum,
                    format!("{} = {BLANK}", terms.join(" + ")),
                    self.quotient().ok_or(PlanError::InvalidOperands)?,
                )
            }
            DivStep::WholeTimes => MicroStep::whole(
                Cue::WholeTimes,
                format!("{} = {} × {BLANK} + {}", show(self.a), show(self.b), show(self.a)),
                0,
            ),
        };
        Ok(step)
    }

    fn advance(&self) -> Result<Advance<Self>, PlanError> {
        let mut next = self.clone();
        match self.step {
            DivStep::BxStart => next.step = DivStep::AMinusUsed,
            DivStep::BxNext => next.step = DivStep::RemMinusChunk,
            DivStep::AMinusUsed | DivStep::RemMinusChunk => {
                next.remainder = self
                    .remainder
                    .checked_sub(self.used()?)
                    .ok_or(PlanError::InvalidOperands)?;
                next.parts.push(self.chunk);
                if next.remainder >= self.b {
                    next.chunk = next_chunk(next.remainder / self.b);
                    next.step = DivStep::BxNext;
                } else if next.parts.len() > 1 {
                    next.chunk = 0;
                    next.step = DivStep::QSum;
                } else {
                    return next.solution().map(Advance::Done);
                }
            }
            DivStep::QSum | DivStep::WholeTimes => return self.solution().map(Advance::Done),
        }
        Ok(Advance::Next(next))
    }

    fn solution(&self) -> Result<Answer, PlanError> {
        if self.b <= 0 {
            return Err(PlanError::InvalidOperands);
        }
        Ok(Answer::Division {
            dividend: self.a,
            divisor: self.b,
            quotient: self.a / self.b,
            remainder: self.a % self.b,
        })
    }

    fn transfer(&self) -> Option<Problem> {
        Some(Problem::Div {
            a: self.a + self.b,
            b: self.b,
        })
    }

    fn validate(&self) -> Result<(), StateError> {
        if self.b <= 0 {
            return Err(StateError::new("div", "divisor must be positive"));
        }
        if !whole_in_range(self.a) || !whole_in_range(self.b) {
            return Err(StateError::new("div", "operand out of range"));
        }
        if self.a < 0 || self.remainder < 0 || self.remainder > self.a {
            return Err(StateError::new("div", "remainder out of range"));
        }
        if self.parts.iter().any(|part| *part <= 0) {
            return Err(StateError::new("div", "non-positive chunk"));
        }
        let accounted = self
            .quotient()
            .and_then(|q| self.b.checked_mul(q))
            .and_then(|used| used.checked_add(self.remainder));
        if accounted != Some(self.a) {
            return Err(StateError::new("div", "chunks and remainder do not add up"));
        }
        let chunk_pending = matches!(
            self.step,
            DivStep::BxStart | DivStep::AMinusUsed | DivStep::BxNext | DivStep::RemMinusChunk
        );
        let fits = self
            .b
            .checked_mul(self.chunk)
            .is_some_and(|used| used <= self.remainder);
        if chunk_pending && (self.chunk <= 0 || !fits) {
            return Err(StateError::new("div", "pending chunk does not fit"));
        }
        let later = matches!(self.step, DivStep::BxNext | DivStep::RemMinusChunk);
        if later && self.parts.is_empty() {
            return Err(StateError::new("div", "no chunk confirmed yet"));
        }
        if self.step == DivStep::QSum && (self.parts.len() < 2 || self.remainder >= self.b) {
            return Err(StateError::new("div", "quotient sum before the chunks are done"));
        }
        if self.step == DivStep::WholeTimes && self.a >= self.b {
            return Err(StateError::new("div", "divisor fits at least once"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(a: i64, b: i64) -> (Vec<String>, Answer) {
        let mut state = DivState::start(a, b).unwrap();
        let mut out = Vec::new();
        loop {
            state.validate().unwrap();
            out.push(state.micro_step().unwrap().line);
            match state.advance().unwrap() {
                Advance::Next(next) => state = next,
                Advance::Done(answer) => return (out, answer),
            }
        }
    }

    #[test]
    fn test_leading_chunk() {
        assert_eq!(leading_chunk(11), 10);
        assert_eq!(leading_chunk(1), 1);
        assert_eq!(leading_chunk(333), 300);
        assert_eq!(leading_chunk(9), 9);
    }

    #[test]
    fn test_184_by_16() {
        let (lines, answer) = run(184, 16);
        assert_eq!(
            lines,
            vec!["16 × 10 = __", "184 − 160 = __", "16 × 1 = __", "24 − 16 = __", "10 + 1 = __"]
        );
        assert_eq!(
            answer,
            Answer::Division {
                dividend: 184,
                divisor: 16,
                quotient: 11,
                remainder: 8
            }
        );
    }

    #[test]
    fn test_next_chunk_below_ten_is_one() {
        assert_eq!(next_chunk(9), 1);
        assert_eq!(next_chunk(1), 1);
        assert_eq!(next_chunk(11), 10);
        assert_eq!(next_chunk(333), 300);
    }

    #[test]
    fn test_small_quotient_goes_one_at_a_time() {
        let (lines, answer) = run(20, 4);
        assert_eq!(lines[0], "4 × 1 = __");
        assert_eq!(lines[1], "20 − 4 = __");
        assert_eq!(lines.last().unwrap(), "1 + 1 + 1 + 1 + 1 = __");
        assert_eq!(lines.len(), 11);
        assert!(matches!(answer, Answer::Division { quotient: 5, remainder: 0, .. }));
    }

    #[test]
    fn test_single_chunk_skips_quotient_sum() {
        let (lines, _) = run(20, 16);
        assert_eq!(lines, vec!["16 × 1 = __", "20 − 16 = __"]);
    }

    #[test]
    fn test_dividend_smaller_than_divisor() {
        let (lines, answer) = run(7, 16);
        assert_eq!(lines, vec!["7 = 16 × __ + 7"]);
        assert!(matches!(answer, Answer::Division { quotient: 0, remainder: 7, .. }));
    }

    #[test]
    fn test_zero_divisor_cannot_start() {
        assert_eq!(DivState::start(5, 0), Err(PlanError::InvalidOperands));
    }

    #[test]
    fn test_validate_rejects_overflowing_state() {
        let state = DivState {
            a: 100,
            b: 4_611_686_018_427_387_904,
            step: DivStep::QSum,
            remainder: 0,
            chunk: 0,
            parts: vec![4, 4],
            progress: Progress::default(),
        };
        assert!(state.validate().is_err());

        let mut state = DivState::start(184, 16).unwrap();
        state.chunk = i64::MAX;
        assert!(state.validate().is_err());
        assert_eq!(state.micro_step(), Err(PlanError::InvalidOperands));
    }

    #[test]
    fn test_validate_catches_tampered_remainder() {
        let mut state = DivState::start(184, 16).unwrap();
        state.remainder = 100;
        assert!(state.validate().is_err());
    }
}
