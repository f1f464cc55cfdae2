//! One reduction per turn for `order_ops` and `negatives`

use super::{Advance, Answer, Canon, Cue, MicroStep, Progress, BLANK};
use crate::classifier::Problem;
use crate::error::{ExprError, PlanError, StateError};
use crate::expr::{self, Op, Token};
use serde::{Deserialize, Serialize};

/// Why this reduction comes first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Innermost brackets
    Brackets,
    /// `×`/`÷` before `+`/`−`
    Precedence,
    /// Same strength, leftmost first
    LeftToRight,
}

/// A two-term sign rewrite shown before the first step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRewrite {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprState {
    /// Canonical expression as first classified
    pub original: String,
    /// Canonical expression still to reduce
    pub expr: String,
    /// Pending sign rewrite narration; cleared after the first step
    #[serde(default)]
    pub rewrite: Option<SignRewrite>,
    #[serde(default)]
    pub negatives: bool,
    #[serde(default)]
    pub progress: Progress,
}

/// `-a + b -> b - a`, `a + (-b) -> a - b`, `a - (-b) -> a + b`
fn sign_rewrite(tokens: &[Token]) -> Option<Vec<Token>> {
    let [Token::Num(x), Token::Op(op), Token::Num(y)] = tokens else {
        return None;
    };
    let (x, y) = (*x, *y);
    let rewritten = match op {
        Op::Add if x < 0.0 && y >= 0.0 => [Token::Num(y), Token::Op(Op::Sub), Token::Num(-x)],
        Op::Add if x >= 0.0 && y < 0.0 => [Token::Num(x), Token::Op(Op::Sub), Token::Num(-y)],
        Op::Sub if x >= 0.0 && y < 0.0 => [Token::Num(x), Token::Op(Op::Add), Token::Num(-y)],
        _ => return None,
    };
    Some(rewritten.to_vec())
}

impl ExprState {
    pub fn start(canonical: &str, negatives: bool) -> Result<Self, PlanError> {
        let tokens = expr::tokenize(canonical)?;
        if expr::next_reduction(&tokens).is_none() {
            return Err(ExprError::Malformed.into());
        }
        // Division by zero anywhere surfaces now, not halfway through
        expr::evaluate(&tokens)?;

        let original = expr::to_canonical(&tokens);
        let (current, rewrite) = match sign_rewrite(&tokens).filter(|_| negatives) {
            Some(rewritten) => {
                let to = expr::to_canonical(&rewritten);
                (
                    to.clone(),
                    Some(SignRewrite {
                        from: original.clone(),
                        to,
                    }),
                )
            }
            None => (original.clone(), None),
        };
        Ok(Self {
            original,
            expr: current,
            rewrite,
            negatives,
            progress: Progress::default(),
        })
    }
}

impl Canon for ExprState {
    fn problem(&self) -> Problem {
        let expr = self.original.clone();
        if self.negatives {
            Problem::Negatives { expr }
        } else {
            Problem::OrderOps { expr }
        }
    }

    fn progress(&self) -> Progress {
        self.progress
    }

    fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn micro_step(&self) -> Result<MicroStep, PlanError> {
        let tokens = expr::tokenize(&self.expr)?;
        let reduction = expr::next_reduction(&tokens).ok_or(ExprError::Malformed)?;
        let scope = if expr::has_parens(&tokens) {
            Scope::Brackets
        } else if reduction.op.binds_tight()
            && tokens
                .iter()
                .any(|t| matches!(t, Token::Op(op) if !op.binds_tight()))
        {
            Scope::Precedence
        } else {
            Scope::LeftToRight
        };
        Ok(MicroStep {
            cue: Cue::Reduce {
                expression: expr::display(&tokens),
                scope,
                rewrite: self.rewrite.as_ref().map(|r| SignRewrite {
                    from: expr::display_str(&r.from),
                    to: expr::display_str(&r.to),
                }),
            },
            line: format!("{} = {BLANK}", reduction.display()),
            expected: reduction.value()?,
        })
    }

    fn advance(&self) -> Result<Advance<Self>, PlanError> {
        let tokens = expr::tokenize(&self.expr)?;
        let reduction = expr::next_reduction(&tokens).ok_or(ExprError::Malformed)?;
        let reduced = expr::apply_reduction(&tokens, &reduction)?;
        if let Some(value) = expr::single_value(&reduced) {
            return Ok(Advance::Done(Answer::Value { value, unit: None }));
        }
        let mut next = self.clone();
        next.expr = expr::to_canonical(&reduced);
        next.rewrite = None;
        Ok(Advance::Next(next))
    }

    fn solution(&self) -> Result<Answer, PlanError> {
        let value = expr::evaluate(&expr::tokenize(&self.original)?)?;
        Ok(Answer::Value { value, unit: None })
    }

    /// Expressions have no adjacent variant; the escape hatch reveals and ends.
    fn transfer(&self) -> Option<Problem> {
        None
    }

    fn validate(&self) -> Result<(), StateError> {
        let kind = if self.negatives { "negatives" } else { "order_ops" };
        let tokens =
            expr::tokenize(&self.expr).map_err(|e| StateError::new(kind, e.to_string()))?;
        if expr::next_reduction(&tokens).is_none() {
            return Err(StateError::new(kind, "nothing left to reduce"));
        }
        let original = expr::tokenize(&self.original)
            .and_then(|t| expr::evaluate(&t))
            .map_err(|e| StateError::new(kind, e.to_string()))?;
        let current =
            expr::evaluate(&tokens).map_err(|e| StateError::new(kind, e.to_string()))?;
        if !crate::numbers::matches_expected(current, original) {
            return Err(StateError::new(kind, "expression drifted from the original"));
        }
        Ok(())
    }
}
