//! The individual review rules, in priority order

use super::{sentences, PolicyRule, ReviewContext};
use crate::classifier::{classify, extract_answer, is_standalone_problem_statement, Problem};
use crate::lexicon::normalize_utterance;
use crate::numbers::{display_number, format_number, matches_expected};
use crate::planner::BLANK;
use crate::state_machine::{open, Effect};
use regex::Regex;
use std::sync::LazyLock;

/// `a - b = __` or `a − b = ?`
static WHOLE_SUBTRACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*[-−]\s*(\d+)\s*=\s*(?:__|\?)").expect("hardcoded regex")
});

/// The canonical opening for `problem`: its first line and the rendered reply
fn opening(ctx: &ReviewContext<'_>, problem: &Problem) -> Option<(String, String)> {
    let opened = open(problem).ok()?;
    let line = opened.effects.iter().rev().find_map(|effect| match effect {
        Effect::Prompt(step) => Some(step.line.clone()),
        _ => None,
    })?;
    Some((line, ctx.coach.render(&opened.effects)))
}

fn attempt(ctx: &ReviewContext<'_>) -> u32 {
    u32::try_from(ctx.turn_index()).unwrap_or(0)
}

/// Stop signal: close the session, never ask anything
pub struct StopRule;

impl PolicyRule for StopRule {
    fn name(&self) -> &'static str {
        "stop"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        ctx.lexicon
            .is_stop(ctx.language, ctx.last_user_text)
            .then(|| ctx.coach.closing(ctx.turn_index()))
    }
}

/// Grammar questions get one grammar micro-step
pub struct GrammarTopicRule;

impl PolicyRule for GrammarTopicRule {
    fn name(&self) -> &'static str {
        "grammar_topic"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        if classify(ctx.last_user_text).is_some() {
            return None;
        }
        let topic = ctx.lexicon.grammar_topic(ctx.language, ctx.last_user_text)?;
        let sample = ctx.lexicon.table(ctx.language).sample;
        Some(ctx.coach.grammar_step(topic, &sample))
    }
}

/// A fresh problem statement always starts with the canonical first step
pub struct MathCanonRule;

impl PolicyRule for MathCanonRule {
    fn name(&self) -> &'static str {
        "math_canon"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        if !is_standalone_problem_statement(ctx.last_user_text, ctx.lexicon) {
            return None;
        }
        let problem = classify(ctx.last_user_text)?;
        let (line, rendered) = opening(ctx, &problem)?;
        (!ctx.proposed.contains(&line)).then_some(rendered)
    }
}

/// A reply asking for the whole subtraction at once is replaced by the
/// first tens step, with the operands taken from the learner's own problem.
pub struct FullAnswerBlockRule;

impl PolicyRule for FullAnswerBlockRule {
    fn name(&self) -> &'static str {
        "full_answer_block"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        let problem = ctx.context_problem()?;
        let Problem::Sub { a, b, .. } = problem else {
            return None;
        };
        let asks_whole = WHOLE_SUBTRACTION.captures_iter(ctx.proposed).any(|caps| {
            let operand = |i| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok());
            operand(1) == Some(a) && operand(2) == Some(b)
        });
        if !asks_whole {
            return None;
        }
        opening(ctx, &problem).map(|(_, rendered)| rendered)
    }
}

/// Shared by the yes/no and ack rules
fn restate_or_close(ctx: &ReviewContext<'_>) -> String {
    match ctx.pending_question() {
        Some(question) => ctx.coach.restate_pending(&question),
        None => ctx.coach.polite_close(ctx.turn_index()),
    }
}

pub struct BareYesNoRule;

impl PolicyRule for BareYesNoRule {
    fn name(&self) -> &'static str {
        "bare_yes_no"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        ctx.lexicon
            .is_yes_no(ctx.language, ctx.last_user_text)
            .then(|| restate_or_close(ctx))
    }
}

pub struct AckOnlyRule;

impl PolicyRule for AckOnlyRule {
    fn name(&self) -> &'static str {
        "ack_only"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        ctx.lexicon
            .is_ack(ctx.language, ctx.last_user_text)
            .then(|| restate_or_close(ctx))
    }
}

/// "We're done! Want another one?" keeps only the first sentence
pub struct CompletionGuardRule;

impl PolicyRule for CompletionGuardRule {
    fn name(&self) -> &'static str {
        "completion_guard"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        if !ctx.proposed.trim_end().ends_with('?')
            || !ctx.lexicon.claims_completion(ctx.language, ctx.proposed)
        {
            return None;
        }
        let first = *sentences(ctx.proposed).first()?;
        Some(match first.strip_suffix('?') {
            Some(statement) => format!("{statement}."),
            None => first.to_string(),
        })
    }
}

/// A numeric reply to an open `... = __` line is checked here, whatever
/// the upstream model made of it.
pub struct MicroStepConfirmRule;

impl PolicyRule for MicroStepConfirmRule {
    fn name(&self) -> &'static str {
        "micro_step_confirm"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        let pending = ctx.pending_line()?;
        let answer = extract_answer(ctx.last_user_text)?;
        if !matches_expected(answer, pending.expected) {
            return Some(ctx.coach.retry_line(attempt(ctx), &pending.line));
        }
        let mentions_value = [display_number(pending.expected), format_number(pending.expected)]
            .iter()
            .any(|shown| ctx.proposed.contains(shown.as_str()));
        if mentions_value {
            return None;
        }
        Some(format!(
            "{} {}",
            ctx.coach.confirm_line(&pending.filled()),
            ctx.proposed.trim()
        ))
    }
}

/// "So what is 184 ÷ 16?" without a blank becomes the first canonical step
pub struct AntiParrotRule;

impl PolicyRule for AntiParrotRule {
    fn name(&self) -> &'static str {
        "anti_parrot"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        if ctx.proposed.contains(BLANK)
            || !ctx.lexicon.asks_for_result(ctx.language, ctx.proposed)
        {
            return None;
        }
        let problem = ctx.context_problem()?;
        if !matches!(problem, Problem::Div { .. } | Problem::Frac { .. }) {
            return None;
        }
        opening(ctx, &problem).map(|(_, rendered)| rendered)
    }
}

/// Drops "estimate/guess" sentences
pub struct LowFrictionLinterRule;

impl PolicyRule for LowFrictionLinterRule {
    fn name(&self) -> &'static str {
        "low_friction_linter"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        if !ctx.lexicon.has_vague_estimate(ctx.language, ctx.proposed) {
            return None;
        }
        let kept = sentences(ctx.proposed)
            .into_iter()
            .filter(|s| !ctx.lexicon.has_vague_estimate(ctx.language, s))
            .collect::<Vec<_>>()
            .join(" ");
        if kept.contains(BLANK) {
            return Some(kept);
        }
        let next = ctx
            .context_problem()
            .and_then(|problem| opening(ctx, &problem))
            .map_or_else(|| ctx.coach.exact_instead(), |(_, rendered)| rendered);
        Some(if kept.is_empty() {
            next
        } else {
            format!("{kept} {next}")
        })
    }
}

/// Never send the same message twice in a row
pub struct AntiRepeatRule;

impl PolicyRule for AntiRepeatRule {
    fn name(&self) -> &'static str {
        "anti_repeat"
    }

    fn apply(&self, ctx: &ReviewContext<'_>) -> Option<String> {
        let last = normalize_utterance(ctx.last_assistant()?);
        if last != normalize_utterance(ctx.proposed) {
            return None;
        }
        let turn = ctx.turn_index();
        let pending = ctx.pending_line();
        let mut candidates = Vec::new();
        if let Some(pending) = &pending {
            candidates.push(format!("{} {}", ctx.coach.vary_lead(turn), pending.line));
            candidates.push(format!("{} {}", ctx.coach.vary_lead(turn + 1), pending.line));
        }
        if let Some((_, rendered)) = ctx
            .context_problem()
            .and_then(|problem| opening(ctx, &problem))
        {
            candidates.push(rendered);
        }
        candidates.push(ctx.coach.generic_next_step());
        candidates
            .into_iter()
            .find(|candidate| normalize_utterance(candidate) != last)
            .or_else(|| {
                Some(format!(
                    "{} {}",
                    ctx.coach.vary_lead(turn),
                    ctx.coach.generic_next_step()
                ))
            })
    }
}
