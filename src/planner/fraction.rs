//! Fraction reduction by trial division

use super::{binary_line, Advance, Answer, Canon, Cue, MicroStep, Progress};
use crate::classifier::Problem;
use crate::error::{PlanError, StateError};
use crate::expr::Op;
use crate::numbers::whole_in_range;
use serde::{Deserialize, Serialize};

/// The only divisors tried. A fraction that needs 7 or 11 to reduce further
/// is reported as simplified.
pub const TRIAL_DIVISORS: [i64; 3] = [2, 3, 5];

fn trial_divisor(numerator: i64, denominator: i64) -> Option<i64> {
    TRIAL_DIVISORS
        .into_iter()
        .find(|d| numerator % d == 0 && denominator % d == 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FracStep {
    Numerator,
    Denominator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FracState {
    pub numerator: i64,
    pub denominator: i64,
    /// Fraction at the start of the current round
    pub current: (i64, i64),
    pub divisor: i64,
    pub step: FracStep,
    /// Confirmed numerator of the current round
    #[serde(default)]
    pub reduced_numerator: Option<i64>,
    #[serde(default)]
    pub progress: Progress,
}

impl FracState {
    pub fn start(numerator: i64, denominator: i64) -> Result<Self, PlanError> {
        if numerator <= 0 || denominator <= 0 {
            return Err(PlanError::InvalidOperands);
        }
        if !whole_in_range(numerator) || !whole_in_range(denominator) {
            return Err(PlanError::InvalidOperands);
        }
        let divisor = trial_divisor(numerator, denominator).ok_or(PlanError::NoTrialDivisor)?;
        Ok(Self {
            numerator,
            denominator,
            current: (numerator, denominator),
            divisor,
            step: FracStep::Numerator,
            reduced_numerator: None,
            progress: Progress::default(),
        })
    }
}

impl Canon for FracState {
    fn problem(&self) -> Problem {
        Problem::Frac {
            numerator: self.numerator,
            denominator: self.denominator,
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn micro_step(&self) -> Result<MicroStep, PlanError> {
        let (n, d) = self.current;
        let k = self.divisor;
        let step = match self.step {
            FracStep::Numerator => MicroStep::whole(
                Cue::DivideTop { divisor: k },
                binary_line(n, Op::Div, k),
                n / k,
            ),
            FracStep::Denominator => MicroStep::whole(
                Cue::DivideBottom { divisor: k },
                binary_line(d, Op::Div, k),
                d / k,
            ),
        };
        Ok(step)
    }

    fn advance(&self) -> Result<Advance<Self>, PlanError> {
        let (n, d) = self.current;
        let k = self.divisor;
        let mut next = self.clone();
        match self.step {
            FracStep::Numerator => {
                next.step = FracStep::Denominator;
                next.reduced_numerator = Some(n / k);
            }
            FracStep::Denominator => {
                let reduced = (n / k, d / k);
                let Some(divisor) = trial_divisor(reduced.0, reduced.1) else {
                    return Ok(Advance::Done(Answer::Fraction {
                        numerator: reduced.0,
                        denominator: reduced.1,
                    }));
                };
                next.current = reduced;
                next.divisor = divisor;
                next.step = FracStep::Numerator;
                next.reduced_numerator = None;
            }
        }
        Ok(Advance::Next(next))
    }

    fn solution(&self) -> Result<Answer, PlanError> {
        let (mut n, mut d) = (self.numerator, self.denominator);
        if n <= 0 || d <= 0 {
            return Err(PlanError::InvalidOperands);
        }
        while let Some(k) = trial_divisor(n, d) {
            n /= k;
            d /= k;
        }
        Ok(Answer::Fraction {
            numerator: n,
            denominator: d,
        })
    }

    fn transfer(&self) -> Option<Problem> {
        Some(Problem::Frac {
            numerator: self.numerator * 2,
            denominator: self.denominator * 2,
        })
    }

    fn validate(&self) -> Result<(), StateError> {
        let (n, d) = self.current;
        if self.numerator <= 0 || self.denominator <= 0 || n <= 0 || d <= 0 {
            return Err(StateError::new("frac", "non-positive part"));
        }
        if !whole_in_range(self.numerator) || !whole_in_range(self.denominator) {
            return Err(StateError::new("frac", "part out of range"));
        }
        let divides = |part: i64| part % self.divisor == 0;
        if !TRIAL_DIVISORS.contains(&self.divisor) || !divides(n) || !divides(d) {
            return Err(StateError::new("frac", "divisor does not divide both parts"));
        }
        // Each round divides both parts by the same factor
        let cross = |x: i64, y: i64| i128::from(x) * i128::from(y);
        if cross(self.numerator, d) != cross(self.denominator, n) {
            return Err(StateError::new("frac", "current fraction differs from the original"));
        }
        match (self.step, self.reduced_numerator) {
            (FracStep::Denominator, Some(r)) if r == n / self.divisor => Ok(()),
            (FracStep::Denominator, _) => {
                Err(StateError::new("frac", "numerator round was never confirmed"))
            }
            (FracStep::Numerator, _) => Ok(()),
        }
    }
}
