//! Internal error types
//!
//! None of these reach an end user. The engine turns every one of them into
//! "unhandled" so the upstream reply goes through unchanged.

use thiserror::Error;

/// Tokenizing or reducing an arithmetic expression failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character {0:?} in expression")]
    UnexpectedChar(char),
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("division by zero")]
    DivisionByZero,
    #[error("malformed expression")]
    Malformed,
    #[error("number out of range")]
    NonFinite,
}

/// The planner cannot produce a confident micro-step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("problem kind is not supported by the planner")]
    Unsupported,
    #[error("operands out of range for this skill")]
    InvalidOperands,
    #[error("no divisor in the trial set divides both parts")]
    NoTrialDivisor,
    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// A carried state contradicts itself and cannot be resumed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("carried {kind} state is inconsistent: {reason}")]
pub struct StateError {
    pub kind: &'static str,
    pub reason: String,
}

impl StateError {
    pub fn new(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}
