//! Turn-level dialogue policy
//!
//! Reviews a reply proposed by an upstream model before it reaches the
//! learner. Rules are independent objects evaluated in a fixed priority
//! order; the first rule that fires replaces the reply and the rest are
//! skipped.

mod rules;

pub use rules::{
    AckOnlyRule, AntiParrotRule, AntiRepeatRule, BareYesNoRule, CompletionGuardRule,
    FullAnswerBlockRule, GrammarTopicRule, LowFrictionLinterRule, MathCanonRule,
    MicroStepConfirmRule, StopRule,
};

use crate::classifier::{classify, is_standalone_problem_statement, normalize_math_text, Problem};
use crate::coach::Coach;
use crate::expr;
use crate::language::Language;
use crate::lexicon::Lexicon;
use crate::planner::BLANK;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// `40 + 20 = __`, `−7 + 12 = __`, `(3 + 4) × 2 = __`
static PENDING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    let number = r"\(*[−-]?\d+(?:[.,]\d+)?\)*";
    Regex::new(&format!(
        r"{number}(?:\s*[+\-−×÷*/]\s*{number})*\s*=\s*{BLANK}"
    ))
    .expect("hardcoded regex")
});

/// `14 = 10 + __`
static SPLIT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(\d+)\s*=\s*(\d+)\s*\+\s*{BLANK}")).expect("hardcoded regex")
});

/// One sentence, including its closing punctuation
static SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\S.*?(?:[.!?]+(?:\s+|\z)|\z)").expect("hardcoded regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A computation left open in the previous assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLine {
    pub line: String,
    pub expected: f64,
}

impl PendingLine {
    pub fn filled(&self) -> String {
        self.line
            .replacen(BLANK, &crate::numbers::display_number(self.expected), 1)
    }
}

/// Everything a rule may look at. Built fresh for each review.
pub struct ReviewContext<'a> {
    pub proposed: &'a str,
    pub history: &'a [Turn],
    pub last_user_text: &'a str,
    pub language: Language,
    pub coach: Coach,
    pub lexicon: &'a Lexicon,
}

impl ReviewContext<'_> {
    pub fn last_assistant(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|turn| turn.role == Role::Assistant)
            .map(|turn| turn.text.as_str())
    }

    /// Assistant messages so far; indexes the phrase rotations
    pub fn turn_index(&self) -> usize {
        self.history
            .iter()
            .filter(|turn| turn.role == Role::Assistant)
            .count()
    }

    /// The problem the learner is working on: the current message if it is
    /// a problem statement, otherwise the most recent one in the history.
    pub fn context_problem(&self) -> Option<Problem> {
        std::iter::once(self.last_user_text)
            .chain(
                self.history
                    .iter()
                    .rev()
                    .filter(|turn| turn.role == Role::User)
                    .map(|turn| turn.text.as_str()),
            )
            .find(|text| is_standalone_problem_statement(text, self.lexicon))
            .and_then(classify)
    }

    /// The last open `... = __` line of the previous assistant message
    pub fn pending_line(&self) -> Option<PendingLine> {
        let message = self.last_assistant()?;
        if let Some(m) = PENDING_LINE.find_iter(message).last() {
            let line = m.as_str().to_string();
            let left = line.rsplit_once('=').map(|(left, _)| left)?;
            let tokens = expr::tokenize(&normalize_math_text(left)).ok()?;
            let expected = expr::evaluate(&tokens).ok()?;
            return Some(PendingLine { line, expected });
        }
        let caps = SPLIT_LINE.captures_iter(message).last()?;
        let whole: i64 = caps.get(1)?.as_str().parse().ok()?;
        let part: i64 = caps.get(2)?.as_str().parse().ok()?;
        #[allow(clippy::cast_precision_loss)]
        let expected = (whole - part) as f64;
        Some(PendingLine {
            line: caps.get(0)?.as_str().to_string(),
            expected,
        })
    }

    /// The question the previous assistant message left open, if any
    pub fn pending_question(&self) -> Option<String> {
        if let Some(pending) = self.pending_line() {
            return Some(pending.line);
        }
        let message = self.last_assistant()?.trim();
        if !message.ends_with('?') {
            return None;
        }
        sentences(message).last().map(|s| (*s).to_string())
    }
}

/// Split a message into trimmed sentences. Decimal points do not split.
pub fn sentences(text: &str) -> Vec<&str> {
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A single review rule
pub trait PolicyRule: Send + Sync {
    /// Stable name used in traces
    fn name(&self) -> &'static str;

    /// The replacement reply, or `None` to pass to the next rule
    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String>;
}

/// Which rules were consulted, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTrace {
    pub rule: String,
    pub fired: bool,
}

/// Outcome of a review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub reply: String,
    pub trace: Vec<RuleTrace>,
}

/// Ordered rule list
pub struct Policy {
    rules: Vec<Box<dyn PolicyRule>>,
}

impl Policy {
    /// The standard rule order
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Box::new(StopRule),
                Box::new(GrammarTopicRule),
                Box::new(MathCanonRule),
                Box::new(FullAnswerBlockRule),
                Box::new(BareYesNoRule),
                Box::new(AckOnlyRule),
                Box::new(CompletionGuardRule),
                Box::new(MicroStepConfirmRule),
                Box::new(AntiParrotRule),
                Box::new(LowFrictionLinterRule),
                Box::new(AntiRepeatRule),
            ],
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run the rules in order; the first one that fires wins.
    pub fn review(&self, ctx: &ReviewContext<'_>) -> Review {
        let mut trace = Vec::new();
        for rule in &self.rules {
            let rewritten = rule.apply(ctx);
            trace.push(RuleTrace {
                rule: rule.name().to_string(),
                fired: rewritten.is_some(),
            });
            if let Some(reply) = rewritten {
                debug!(rule = rule.name(), "Policy rule fired");
                return Review { reply, trace };
            }
        }
        Review {
            reply: ctx.proposed.to_string(),
            trace,
        }
    }
}
