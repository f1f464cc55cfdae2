//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across generated problems and
//! learner replies.

#![allow(clippy::cast_precision_loss)]

use super::*;
use crate::classifier::{Problem, StudentInput};
use crate::coach::Coach;
use crate::engine::{Engine, TurnRequest};
use crate::expr::{self, Op};
use crate::language::Language;
use crate::lexicon::normalize_utterance;
use crate::numbers::{format_number, matches_expected, MAX_WHOLE};
use crate::planner::{Answer, MicroStep, BLANK};
use crate::EngineConfig;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn pending(result: &TransitionResult) -> Option<&MicroStep> {
    match result.effects.last() {
        Some(Effect::Prompt(step)) => Some(step),
        _ => None,
    }
}

/// Answer every step correctly. Returns the number of answered steps and
/// the final answer.
fn solve(problem: &Problem) -> (u32, Answer) {
    let mut state = open(problem).unwrap().new_state.unwrap();
    let mut turns = 0;
    loop {
        let expected = state.micro_step().unwrap().expected;
        let result = transition(&state, StudentInput::Answer(expected)).unwrap();
        turns += 1;
        assert!(turns < 50, "no terminal step for {problem:?}");
        match result.new_state {
            Some(next) => state = next,
            None => match result.effects.last() {
                Some(Effect::Solved { answer, turn, .. }) => {
                    assert_eq!(*turn, turns);
                    return (turns, answer.clone());
                }
                other => panic!("terminal without Solved: {other:?}"),
            },
        }
    }
}

fn session_turn(
    engine: &Engine,
    state: Option<ConversationState>,
    text: &str,
    last: Option<String>,
) -> crate::engine::TurnResponse {
    engine.handle_turn(&TurnRequest {
        prior_state: state,
        last_user_text: text.to_string(),
        age: 10,
        language: "en".to_string(),
        last_assistant_message: last,
    })
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_add_sub() -> impl Strategy<Value = Problem> {
    (0i64..1000, 0i64..1000, any::<bool>()).prop_map(|(a, b, sub)| {
        if sub {
            Problem::Sub { a, b, unit: None }
        } else {
            Problem::Add { a, b, unit: None }
        }
    })
}

fn arb_mul() -> impl Strategy<Value = Problem> {
    (0i64..200, 0i64..100).prop_map(|(a, b)| Problem::Mul { a, b })
}

fn arb_div() -> impl Strategy<Value = Problem> {
    (0i64..10_000, 1i64..100).prop_map(|(a, b)| Problem::Div { a, b })
}

fn arb_frac() -> impl Strategy<Value = Problem> {
    (1i64..20, 1i64..20, prop::sample::select(vec![2i64, 3, 5])).prop_map(|(n, d, common)| {
        Problem::Frac {
            numerator: n * common,
            denominator: d * common,
        }
    })
}

fn arb_percent() -> impl Strategy<Value = Problem> {
    (
        prop::sample::select(vec![50.0, 25.0, 20.0, 10.0, 30.0, 70.0, 15.0, 8.0]),
        1u32..1000,
    )
        .prop_map(|(percent, base)| Problem::Percent {
            percent,
            base: f64::from(base),
        })
}

fn arb_unknown() -> impl Strategy<Value = Problem> {
    (
        prop_oneof![Just(Op::Add), Just(Op::Sub)],
        0i64..500,
        0i64..500,
        any::<bool>(),
    )
        .prop_map(|(op, known, result, blank_first)| Problem::Unknown {
            op,
            known,
            result,
            blank_first,
        })
}

fn arb_expression() -> impl Strategy<Value = String> {
    let operand = (1i64..20).prop_map(|n| n.to_string());
    let op = prop::sample::select(vec!["+", "-", "*", "/"]);
    (
        operand.clone(),
        proptest::collection::vec((op, operand), 2..4),
        any::<bool>(),
    )
        .prop_map(|(first, rest, bracket)| {
            let mut text = first;
            for (i, (op, n)) in rest.into_iter().enumerate() {
                if bracket && i == 0 {
                    text = format!("({text} {op} {n})");
                } else {
                    text = format!("{text} {op} {n}");
                }
            }
            text
        })
}

fn arb_problem() -> impl Strategy<Value = Problem> {
    prop_oneof![
        arb_add_sub(),
        arb_mul(),
        arb_div(),
        arb_frac(),
        arb_percent(),
        arb_unknown(),
        arb_expression().prop_map(|expr| Problem::OrderOps { expr }),
    ]
}

/// Learner replies that never advance on their own
fn arb_non_answer() -> impl Strategy<Value = StudentInput> {
    prop_oneof![
        Just(StudentInput::Stuck),
        Just(StudentInput::Ack),
        Just(StudentInput::YesNo),
        Just(StudentInput::Other),
    ]
}

/// Problem statements with operands up to the planning range
fn arb_large_statement() -> impl Strategy<Value = String> {
    let operand = prop_oneof![MAX_WHOLE - 1000..=MAX_WHOLE, 0i64..=MAX_WHOLE];
    (
        operand.clone(),
        operand,
        prop::sample::select(vec!["+", "-", "*", "/", "+ ? =", "- ? ="]),
    )
        .prop_map(|(a, b, op)| format!("{a} {op} {b}"))
}

/// Raw learner text for whole-session properties
fn arb_learner_text() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..200).prop_map(|n| n.to_string()),
        Just("ok".to_string()),
        Just("yes".to_string()),
        Just("I don't know".to_string()),
        Just("help".to_string()),
        Just("hmm".to_string()),
        Just("47 + 28".to_string()),
        Just("184/16".to_string()),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Exact answers finish add/sub in 3 turns
    #[test]
    fn prop_add_sub_take_three_turns(problem in arb_add_sub()) {
        let (turns, answer) = solve(&problem);
        prop_assert_eq!(turns, 3);
        let (a, b, sub) = match problem {
            Problem::Add { a, b, .. } => (a, b, false),
            Problem::Sub { a, b, .. } => (a, b, true),
            _ => unreachable!(),
        };
        let expected = if sub { a - b } else { a + b };
        match answer {
            Answer::Value { value, .. } => prop_assert!(matches_expected(value, expected as f64)),
            other => prop_assert!(false, "unexpected answer {:?}", other),
        }
    }

    // Exact answers finish mul in 4 turns on the default path
    #[test]
    fn prop_mul_takes_four_turns((a, b) in (0i64..200, 0i64..100)) {
        let (turns, answer) = solve(&Problem::Mul { a, b });
        prop_assert_eq!(turns, 4);
        match answer {
            Answer::Value { value, .. } => prop_assert!(matches_expected(value, (a * b) as f64)),
            other => prop_assert!(false, "unexpected answer {:?}", other),
        }
    }

    // b * q + r == a and 0 <= r < b
    #[test]
    fn prop_division_identity(problem in arb_div()) {
        let (_, answer) = solve(&problem);
        let Answer::Division { dividend, divisor, quotient, remainder } = answer else {
            return Err(TestCaseError::fail("division did not end in a quotient"));
        };
        prop_assert_eq!(divisor * quotient + remainder, dividend);
        prop_assert!((0..divisor).contains(&remainder));
    }

    // Step-by-step reduction lands on the directly evaluated value
    #[test]
    fn prop_expression_matches_evaluation(text in arb_expression()) {
        let tokens = expr::tokenize(&text).unwrap();
        prop_assume!(expr::evaluate(&tokens).is_ok());
        let direct = expr::evaluate(&tokens).unwrap();
        let (turns, answer) = solve(&Problem::OrderOps { expr: expr::to_canonical(&tokens) });
        prop_assert_eq!(turns as usize, expr::operator_count(&tokens));
        match answer {
            Answer::Value { value, .. } => prop_assert!(matches_expected(value, direct)),
            other => prop_assert!(false, "unexpected answer {:?}", other),
        }
    }

    // A wrong answer returns the same prompt, byte for byte
    #[test]
    fn prop_wrong_answer_reasks_same_prompt(
        problem in arb_problem(),
        offset in prop_oneof![-50.0..-0.5f64, 0.5..50.0f64],
        steps in 0usize..3,
    ) {
        let Ok(opened) = open(&problem) else { return Ok(()) };
        let mut state = opened.new_state.unwrap();
        for _ in 0..steps {
            let expected = state.micro_step().unwrap().expected;
            match transition(&state, StudentInput::Answer(expected)).unwrap().new_state {
                Some(next) => state = next,
                None => return Ok(()),
            }
        }
        let before = state.micro_step().unwrap();
        let result = transition(&state, StudentInput::Answer(before.expected + offset)).unwrap();
        let after = pending(&result).unwrap();
        prop_assert_eq!(&after.line, &before.line);
        let next = result.new_state.unwrap();
        prop_assert_eq!(next.progress().turn, state.progress().turn);
        prop_assert_eq!(next.micro_step().unwrap(), before);
    }

    // Non-answers never advance the step or the turn counter
    #[test]
    fn prop_non_answers_do_not_advance(problem in arb_problem(), input in arb_non_answer()) {
        let Ok(opened) = open(&problem) else { return Ok(()) };
        let state = opened.new_state.unwrap();
        let result = transition(&state, input).unwrap();
        prop_assert_eq!(result.new_state.as_ref().map_or(0, |s| s.progress().turn), 0);
        if input != StudentInput::Stuck {
            prop_assert_eq!(pending(&result).unwrap(), &state.micro_step().unwrap());
        }
    }

    // Stuck forever never loops: the escape hatch ends the problem
    #[test]
    fn prop_stuck_escape_hatch_is_bounded(problem in arb_problem()) {
        let Ok(opened) = open(&problem) else { return Ok(()) };
        let mut state = opened.new_state.unwrap();
        for _ in 0..3 {
            state = transition(&state, StudentInput::Stuck).unwrap().new_state.unwrap();
        }
        let result = transition(&state, StudentInput::Stuck).unwrap();
        let revealed = matches!(result.effects.first(), Some(Effect::Reveal { .. }));
        prop_assert!(revealed);
        if let Some(next) = result.new_state {
            prop_assert_eq!(next.progress(), crate::planner::Progress::default());
            prop_assert_ne!(next.problem(), problem);
        }
    }

    // Every pending reply renders with exactly one blank, in every band
    #[test]
    fn prop_prompts_have_one_blank(
        problem in arb_problem(),
        age in 6u32..40,
        english in any::<bool>(),
    ) {
        let Ok(opened) = open(&problem) else { return Ok(()) };
        let lang = if english { Language::En } else { Language::Nl };
        let coach = Coach::new(lang, age);
        let mut result = opened;
        loop {
            let text = coach.render(&result.effects);
            match result.new_state {
                Some(state) => {
                    prop_assert_eq!(text.matches(BLANK).count(), 1, "{}", text);
                    let expected = state.micro_step().unwrap().expected;
                    result = transition(&state, StudentInput::Answer(expected)).unwrap();
                }
                None => {
                    prop_assert_eq!(text.matches(BLANK).count(), 0, "{}", text);
                    prop_assert!(!text.contains('?'), "terminal asks: {}", text);
                    break;
                }
            }
        }
    }

    // Serialized state survives the caller's round trip
    #[test]
    fn prop_state_serde_round_trip(problem in arb_problem(), steps in 0usize..3) {
        let Ok(opened) = open(&problem) else { return Ok(()) };
        let mut state = opened.new_state.unwrap();
        for _ in 0..steps {
            let expected = state.micro_step().unwrap().expected;
            match transition(&state, StudentInput::Answer(expected)).unwrap().new_state {
                Some(next) => state = next,
                None => return Ok(()),
            }
        }
        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        prop_assert!(back.validate().is_ok());
        prop_assert_eq!(back.kind(), state.kind());
        prop_assert_eq!(back.progress(), state.progress());
        prop_assert_eq!(back.micro_step().unwrap().line, state.micro_step().unwrap().line);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Once stopped, numbers alone never bring the old problem back
    #[test]
    fn prop_stop_is_absorbing(
        before in proptest::collection::vec(arb_learner_text(), 0..6),
        after in proptest::collection::vec(0i64..200, 1..5),
    ) {
        let engine = Engine::new(EngineConfig::default());
        let mut state = session_turn(&engine, None, "47 + 28", None).next_state;
        for text in &before {
            state = session_turn(&engine, state, text, None).next_state;
        }
        let stopped = session_turn(&engine, state, "stop", None);
        prop_assert!(stopped.handled);
        prop_assert!(stopped.next_state.is_none());
        prop_assert!(!stopped.message.unwrap_or_default().contains('?'));

        let mut state = None;
        for n in after {
            let r = session_turn(&engine, state, &n.to_string(), None);
            prop_assert!(!r.handled);
            prop_assert!(r.next_state.is_none());
            state = r.next_state;
        }
    }

    // Operands at the edge of the planning range open cleanly or not at all
    #[test]
    fn prop_large_operands_never_panic(
        statement in arb_large_statement(),
        replies in proptest::collection::vec(arb_learner_text(), 1..5),
    ) {
        let engine = Engine::new(EngineConfig::default());
        let opened = session_turn(&engine, None, &statement, None);
        prop_assert_eq!(opened.handled, opened.next_state.is_some());
        let mut state = opened.next_state;
        for text in &replies {
            if let Some(carried) = &state {
                prop_assert!(carried.validate().is_ok());
                let expected = carried.micro_step().unwrap().expected;
                state = session_turn(&engine, state.clone(), &format_number(expected), None)
                    .next_state;
            }
            state = session_turn(&engine, state, text, None).next_state;
        }
    }

    // Consecutive engine messages are never the same after normalization
    #[test]
    fn prop_no_verbatim_repeats(texts in proptest::collection::vec(arb_learner_text(), 1..15)) {
        let engine = Engine::new(EngineConfig::default());
        let mut state = None;
        let mut last: Option<String> = None;
        for text in &texts {
            let r = session_turn(&engine, state, text, last.clone());
            state = r.next_state;
            if let Some(message) = r.message {
                if let Some(previous) = &last {
                    prop_assert_ne!(
                        normalize_utterance(&message),
                        normalize_utterance(previous),
                        "repeated after {:?}",
                        text
                    );
                }
                last = Some(message);
            }
        }
    }
}
