//! Percent-of via shortcuts, tenths or hundredths

use super::{Advance, Answer, Canon, Cue, MicroStep, Progress, BLANK};
use crate::classifier::Problem;
use crate::error::{PlanError, StateError};
use crate::expr::Op;
use crate::numbers::{display_number, matches_expected, to_whole};
use serde::{Deserialize, Serialize};

const SHORTCUTS: [(f64, i64); 4] = [(50.0, 2), (25.0, 4), (20.0, 5), (10.0, 10)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum PercentPlan {
    /// 50/25/20/10%: one division
    Shortcut { divisor: i64 },
    /// Multiples of 10%: find 10%, then scale
    Tenths,
    /// Anything else: find 1%, then scale
    Hundredths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentStep {
    Divide,
    Scale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentState {
    pub percent: f64,
    pub base: f64,
    pub plan: PercentPlan,
    pub step: PercentStep,
    /// Confirmed 10% or 1% part
    #[serde(default)]
    pub part: Option<f64>,
    #[serde(default)]
    pub progress: Progress,
}

impl PercentState {
    pub fn start(percent: f64, base: f64) -> Result<Self, PlanError> {
        if !percent.is_finite() || !base.is_finite() || percent <= 0.0 || base < 0.0 {
            return Err(PlanError::InvalidOperands);
        }
        let shortcut = SHORTCUTS
            .iter()
            .find(|(p, _)| matches_expected(percent, *p))
            .map(|(_, divisor)| PercentPlan::Shortcut { divisor: *divisor });
        let plan = shortcut.unwrap_or_else(|| match to_whole(percent) {
            Some(p) if p % 10 == 0 => PercentPlan::Tenths,
            _ => PercentPlan::Hundredths,
        });
        Ok(Self {
            percent,
            base,
            plan,
            step: PercentStep::Divide,
            part: None,
            progress: Progress::default(),
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn divisor(&self) -> f64 {
        match self.plan {
            PercentPlan::Shortcut { divisor } => divisor as f64,
            PercentPlan::Tenths => 10.0,
            PercentPlan::Hundredths => 100.0,
        }
    }

    fn factor(&self) -> f64 {
        match self.plan {
            PercentPlan::Shortcut { .. } => 1.0,
            PercentPlan::Tenths => self.percent / 10.0,
            PercentPlan::Hundredths => self.percent,
        }
    }

    fn unit_part(&self) -> f64 {
        self.base / self.divisor()
    }
}

fn float_line(left: f64, op: Op, right: f64) -> String {
    format!(
        "{} {} {} = {BLANK}",
        display_number(left),
        op.symbol(),
        display_number(right)
    )
}

impl Canon for PercentState {
    fn problem(&self) -> Problem {
        Problem::Percent {
            percent: self.percent,
            base: self.base,
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn micro_step(&self) -> Result<MicroStep, PlanError> {
        let cue = match (self.step, self.plan) {
            (PercentStep::Divide, PercentPlan::Shortcut { divisor }) => Cue::PercentShortcut {
                percent: self.percent,
                divisor,
            },
            (PercentStep::Divide, PercentPlan::Tenths) => Cue::PercentUnit { percent_unit: 10 },
            (PercentStep::Divide, PercentPlan::Hundredths) => Cue::PercentUnit { percent_unit: 1 },
            (PercentStep::Scale, _) => Cue::PercentScale {
                factor: self.factor(),
            },
        };
        let (line, expected) = match self.step {
            PercentStep::Divide => (
                float_line(self.base, Op::Div, self.divisor()),
                self.unit_part(),
            ),
            PercentStep::Scale => {
                let part = self.part.unwrap_or_else(|| self.unit_part());
                (
                    float_line(part, Op::Mul, self.factor()),
                    part * self.factor(),
                )
            }
        };
        Ok(MicroStep {
            cue,
            line,
            expected,
        })
    }

    fn advance(&self) -> Result<Advance<Self>, PlanError> {
        match (self.step, self.plan) {
            (PercentStep::Divide, PercentPlan::Shortcut { .. }) | (PercentStep::Scale, _) => {
                self.solution().map(Advance::Done)
            }
            (PercentStep::Divide, _) => {
                let mut next = self.clone();
                next.step = PercentStep::Scale;
                next.part = Some(self.unit_part());
                Ok(Advance::Next(next))
            }
        }
    }

    fn solution(&self) -> Result<Answer, PlanError> {
        let value = self.unit_part() * self.factor();
        if !value.is_finite() {
            return Err(PlanError::InvalidOperands);
        }
        Ok(Answer::Value { value, unit: None })
    }

    fn transfer(&self) -> Option<Problem> {
        Some(Problem::Percent {
            percent: self.percent,
            base: self.base * 2.0,
        })
    }

    fn validate(&self) -> Result<(), StateError> {
        if !self.percent.is_finite() || !self.base.is_finite() {
            return Err(StateError::new("percent", "non-finite operand"));
        }
        if self.percent <= 0.0 || self.base < 0.0 {
            return Err(StateError::new("percent", "operand out of range"));
        }
        if let PercentPlan::Shortcut { divisor } = self.plan {
            let known = SHORTCUTS
                .iter()
                .any(|(p, d)| *d == divisor && matches_expected(self.percent, *p));
            if !known {
                return Err(StateError::new("percent", "shortcut does not fit the percentage"));
            }
            if self.step == PercentStep::Scale {
                return Err(StateError::new("percent", "shortcut has no scale step"));
            }
        }
        if self.step == PercentStep::Scale
            && !self
                .part
                .is_some_and(|p| matches_expected(p, self.unit_part()))
        {
            return Err(StateError::new("percent", "unit part was never confirmed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(percent: f64, base: f64) -> (Vec<String>, f64) {
        let mut state = PercentState::start(percent, base).unwrap();
        let mut lines = Vec::new();
        loop {
            lines.push(state.micro_step().unwrap().line);
            match state.advance().unwrap() {
                Advance::Next(next) => state = next,
                Advance::Done(Answer::Value { value, .. }) => return (lines, value),
                Advance::Done(other) => panic!("unexpected answer {other:?}"),
            }
        }
    }

    #[test]
    fn test_shortcut_is_one_step() {
        let (lines, value) = walk(25.0, 80.0);
        assert_eq!(lines, vec!["80 ÷ 4 = __"]);
        assert!(matches_expected(value, 20.0));
    }

    #[test]
    fn test_multiple_of_ten() {
        let (lines, value) = walk(30.0, 70.0);
        assert_eq!(lines, vec!["70 ÷ 10 = __", "7 × 3 = __"]);
        assert!(matches_expected(value, 21.0));
    }

    #[test]
    fn test_hundredths_fallback() {
        let (lines, value) = walk(15.0, 60.0);
        assert_eq!(lines, vec!["60 ÷ 100 = __", "0.6 × 15 = __"]);
        assert!(matches_expected(value, 9.0));
    }

    #[test]
    fn test_decimal_intermediate_is_checked_with_tolerance() {
        let state = PercentState::start(15.0, 60.0).unwrap();
        let step = state.micro_step().unwrap();
        assert!(matches_expected(0.6, step.expected));
    }

    #[test]
    fn test_zero_percent_rejected() {
        assert_eq!(PercentState::start(0.0, 60.0), Err(PlanError::InvalidOperands));
    }
}
