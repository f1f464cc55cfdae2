//! The engine's two entry points
//!
//! [`Engine::handle_turn`] drives a tutoring session from the learner's raw
//! text and the state the caller carried from the previous turn.
//! [`Engine::review`] checks a reply an upstream model already proposed.
//!
//! Neither ever fails: anything the engine cannot handle confidently comes
//! back as `handled = false` (or the unchanged proposal) and the caller
//! uses the upstream reply.

use crate::classifier::{classify, is_standalone_problem_statement, StudentInput};
use crate::coach::Coach;
use crate::config::EngineConfig;
use crate::language::Language;
use crate::lexicon::{normalize_utterance, Lexicon};
use crate::policy::{Policy, ReviewContext, RuleTrace, Turn};
use crate::state_machine::{open, transition, ConversationState, TransitionResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One learner turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub prior_state: Option<ConversationState>,
    pub last_user_text: String,
    pub age: u32,
    pub language: String,
    /// The previous assistant message, for the anti-repeat check
    #[serde(default)]
    pub last_assistant_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// `None` tells the caller to drop its state
    pub next_state: Option<ConversationState>,
}

impl TurnResponse {
    fn handled(message: String, next_state: Option<ConversationState>) -> Self {
        Self {
            handled: true,
            message: Some(message),
            action: Some(Action::None),
            next_state,
        }
    }

    fn unhandled() -> Self {
        Self {
            handled: false,
            message: None,
            action: None,
            next_state: None,
        }
    }
}

/// An upstream reply to check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub proposed_reply: String,
    #[serde(default)]
    pub conversation_history: Vec<Turn>,
    pub last_user_text: String,
    pub age: u32,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<RuleTrace>>,
}

/// Stateless between calls; safe to share across conversations.
pub struct Engine {
    config: EngineConfig,
    lexicon: &'static Lexicon,
    policy: Policy,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            lexicon: Lexicon::shared(),
            policy: Policy::standard(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn language(&self, tag: &str) -> Language {
        Language::from_tag(tag).unwrap_or(self.config.default_language)
    }

    /// Primary contract: learner text in, next micro-step out.
    pub fn handle_turn(&self, request: &TurnRequest) -> TurnResponse {
        let language = self.language(&request.language);
        let coach = Coach::new(language, request.age);
        let response = self.respond(request, language, coach);

        // A message identical to the previous one gets a different lead-in
        let repeated = match (&response.message, &request.last_assistant_message) {
            (Some(message), Some(last)) => {
                normalize_utterance(message) == normalize_utterance(last)
            }
            _ => false,
        };
        if !repeated {
            return response;
        }
        debug!("Varying a repeated message");
        let turn = response
            .next_state
            .as_ref()
            .map_or(0, |state| state.progress().misses as usize);
        let message = response
            .message
            .map(|message| format!("{} {message}", coach.vary_lead(turn)));
        TurnResponse {
            message,
            ..response
        }
    }

    fn respond(&self, request: &TurnRequest, language: Language, coach: Coach) -> TurnResponse {
        let text = request.last_user_text.as_str();
        let turn = request
            .prior_state
            .as_ref()
            .map_or(0, |state| state.progress().turn as usize);

        if self.lexicon.is_stop(language, text) {
            debug!(%language, "Stop signal, clearing state");
            return TurnResponse::handled(coach.closing(turn), None);
        }

        if classify(text).is_none() {
            if let Some(topic) = self.lexicon.grammar_topic(language, text) {
                debug!(%language, ?topic, "Grammar topic");
                let sample = self.lexicon.table(language).sample;
                return TurnResponse::handled(coach.grammar_step(topic, &sample), None);
            }
        }

        // A fresh problem statement wins over carried state
        if is_standalone_problem_statement(text, self.lexicon) {
            if let Some(problem) = classify(text) {
                debug!(kind = problem.kind(), "Fresh problem statement");
                return match open(&problem) {
                    Ok(opened) => render(coach, opened),
                    Err(e) => {
                        debug!(kind = problem.kind(), error = %e, "Cannot plan problem");
                        TurnResponse::unhandled()
                    }
                };
            }
        }

        let Some(state) = &request.prior_state else {
            if self.lexicon.is_ack(language, text) || self.lexicon.is_yes_no(language, text) {
                debug!("Acknowledgement with nothing pending");
                return TurnResponse::handled(coach.polite_close(turn), None);
            }
            debug!("No problem and no carried state");
            return TurnResponse::unhandled();
        };

        if let Err(e) = state.validate() {
            warn!(error = %e, "Dropping invalid carried state");
            return TurnResponse::unhandled();
        }

        let input = StudentInput::classify(text, language, self.lexicon);
        match transition(state, input) {
            Ok(result) => {
                debug!(
                    kind = state.kind(),
                    ?input,
                    done = result.new_state.is_none(),
                    "Transition"
                );
                render(coach, result)
            }
            Err(e) => {
                debug!(kind = state.kind(), error = %e, "Transition failed");
                TurnResponse::unhandled()
            }
        }
    }

    /// Secondary contract: run the policy rules over an upstream reply.
    pub fn review(&self, request: &ReviewRequest) -> ReviewedReply {
        let language = self.language(&request.language);
        let ctx = ReviewContext {
            proposed: &request.proposed_reply,
            history: &request.conversation_history,
            last_user_text: &request.last_user_text,
            language,
            coach: Coach::new(language, request.age),
            lexicon: self.lexicon,
        };
        let review = self.policy.review(&ctx);
        ReviewedReply {
            reply: review.reply,
            trace: self.config.policy_trace.then_some(review.trace),
        }
    }
}

fn render(coach: Coach, result: TransitionResult) -> TurnResponse {
    TurnResponse::handled(coach.render(&result.effects), result.new_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::BLANK;

    struct Session {
        engine: Engine,
        state: Option<ConversationState>,
        last: Option<String>,
        language: &'static str,
    }

    impl Session {
        fn new(language: &'static str) -> Self {
            Self {
                engine: Engine::new(EngineConfig::default()),
                state: None,
                last: None,
                language,
            }
        }

        fn say(&mut self, text: &str) -> TurnResponse {
            let response = self.engine.handle_turn(&TurnRequest {
                prior_state: self.state.take(),
                last_user_text: text.to_string(),
                age: 10,
                language: self.language.to_string(),
                last_assistant_message: self.last.clone(),
            });
            self.state = response.next_state.clone();
            if let Some(message) = &response.message {
                self.last = Some(message.clone());
            }
            response
        }
    }

    fn message(response: &TurnResponse) -> &str {
        response.message.as_deref().unwrap_or_default()
    }

    #[test]
    fn test_addition_scenario() {
        let mut s = Session::new("en");

        let r = s.say("47 + 28");
        assert!(r.handled);
        assert!(message(&r).ends_with("40 + 20 = __"));

        let r = s.say("75");
        assert!(message(&r).ends_with("40 + 20 = __"));

        let r = s.say("60");
        assert!(message(&r).ends_with("7 + 8 = __"));

        let r = s.say("15");
        assert!(message(&r).ends_with("60 + 15 = __"));

        let r = s.say("75");
        assert!(message(&r).starts_with("Correct!"));
        assert!(!message(&r).contains('?'));
        assert!(!message(&r).contains(BLANK));
        assert!(r.next_state.is_none());
    }

    #[test]
    fn test_division_scenario() {
        let mut s = Session::new("en");
        let expected = [
            ("184/16", "16 × 10 = __"),
            ("160", "184 − 160 = __"),
            ("24", "16 × 1 = __"),
            ("16", "24 − 16 = __"),
            ("8", "10 + 1 = __"),
        ];
        for (input, line) in expected {
            let r = s.say(input);
            assert!(message(&r).ends_with(line), "{input}: {}", message(&r));
        }
        let r = s.say("11");
        assert!(r.next_state.is_none());
        assert!(message(&r).contains("quotient 11, remainder 8"));
        assert!(message(&r).contains("16 × 11 + 8 = 184"));
    }

    #[test]
    fn test_stop_is_absorbing() {
        let mut s = Session::new("nl");
        s.say("47 + 28");
        let r = s.say("stop");
        assert!(r.handled);
        assert!(r.next_state.is_none());
        assert!(!message(&r).contains('?'));
        let r = s.say("60");
        assert!(!r.handled);
        assert!(r.next_state.is_none());
    }

    #[test]
    fn test_fresh_problem_replaces_carried_state() {
        let mut s = Session::new("en");
        s.say("47 + 28");
        let r = s.say("184 / 16");
        assert!(message(&r).ends_with("16 × 10 = __"));
        assert_eq!(r.next_state.unwrap().kind(), "div");
    }

    #[test]
    fn test_unrecognized_text_is_unhandled() {
        let mut s = Session::new("en");
        let r = s.say("tell me a story about dragons");
        assert!(!r.handled);
        assert!(r.message.is_none());
        assert!(r.action.is_none());
    }

    #[test]
    fn test_unplannable_problem_is_unhandled() {
        let mut s = Session::new("en");
        let r = s.say("simplify 7/11");
        assert!(!r.handled);
        assert!(r.next_state.is_none());
    }

    #[test]
    fn test_invalid_carried_state_is_dropped() {
        let engine = Engine::new(EngineConfig::default());
        let state: ConversationState = serde_json::from_value(serde_json::json!({
            "kind": "div", "a": 10, "b": 0, "step": "bx_start", "remainder": 10, "chunk": 1
        }))
        .unwrap();
        let r = engine.handle_turn(&TurnRequest {
            prior_state: Some(state),
            last_user_text: "5".to_string(),
            age: 10,
            language: "en".to_string(),
            last_assistant_message: None,
        });
        assert!(!r.handled);
        assert!(r.next_state.is_none());
    }

    fn carried(state: serde_json::Value, text: &str) -> TurnResponse {
        let engine = Engine::new(EngineConfig::default());
        engine.handle_turn(&TurnRequest {
            prior_state: Some(serde_json::from_value(state).unwrap()),
            last_user_text: text.to_string(),
            age: 10,
            language: "en".to_string(),
            last_assistant_message: None,
        })
    }

    #[test]
    fn test_huge_operands_are_unhandled() {
        let mut s = Session::new("en");
        let r = s.say("999999999999 * 999999999999");
        assert!(!r.handled);
        assert!(r.next_state.is_none());
        let r = s.say("9");
        assert!(!r.handled);

        let r = s.say("9223372036854775807 + ? = -9");
        assert!(!r.handled);
        assert!(r.next_state.is_none());
    }

    #[test]
    fn test_overflowing_carried_state_is_dropped() {
        let r = carried(
            serde_json::json!({
                "kind": "div", "a": 100, "b": 4_611_686_018_427_387_904_i64,
                "step": "q_sum", "remainder": 0, "chunk": 0, "parts": [4, 4]
            }),
            "8",
        );
        assert!(!r.handled);
        assert!(r.next_state.is_none());

        let r = carried(
            serde_json::json!({
                "kind": "mul", "a": 999_999_999_999_i64, "b": 999_999_999_999_i64,
                "step": "tens_part"
            }),
            "9",
        );
        assert!(!r.handled);

        let r = carried(
            serde_json::json!({
                "kind": "unknown", "op": "add", "known": i64::MAX,
                "result": -9, "blank_first": true
            }),
            "9",
        );
        assert!(!r.handled);
    }

    #[test]
    fn test_ack_without_pending_step_closes_politely() {
        let mut s = Session::new("en");
        let r = s.say("ok");
        assert!(r.handled);
        assert!(r.next_state.is_none());
        assert!(!message(&r).contains('?'));
        assert!(!message(&r).contains(BLANK));
    }

    #[test]
    fn test_repeated_message_gets_new_lead() {
        let engine = Engine::new(EngineConfig::default());
        let request = |text: &str, state: Option<ConversationState>, last: Option<String>| {
            TurnRequest {
                prior_state: state,
                last_user_text: text.to_string(),
                age: 10,
                language: "en".to_string(),
                last_assistant_message: last,
            }
        };
        let state = engine.handle_turn(&request("47 + 28", None, None)).next_state;
        let first = engine.handle_turn(&request("ok", state.clone(), None));
        let again = engine.handle_turn(&request("ok", state, first.message.clone()));
        let first = first.message.unwrap();
        let again = again.message.unwrap();
        assert_ne!(normalize_utterance(&again), normalize_utterance(&first));
        assert!(again.ends_with(&first));
    }

    #[test]
    fn test_grammar_topic_routes_without_state() {
        let mut s = Session::new("fr");
        let r = s.say("aide-moi avec le pluriel");
        assert!(r.handled);
        assert!(r.next_state.is_none());
        assert_eq!(message(&r).matches(BLANK).count(), 1);
    }

    #[test]
    fn test_unknown_language_uses_default() {
        let mut s = Session::new("pl");
        let r = s.say("47 + 28");
        assert!(message(&r).starts_with("We lossen"));
    }

    #[test]
    fn test_response_wire_shape() {
        let mut s = Session::new("en");
        let r = s.say("25% of 80");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["handled"], true);
        assert_eq!(json["action"], "none");
        assert_eq!(json["next_state"]["kind"], "percent");

        let json = serde_json::to_value(TurnResponse::unhandled()).unwrap();
        assert!(json.get("message").is_none());
        assert!(json["next_state"].is_null());
    }

    #[test]
    fn test_review_trace_follows_config() {
        let request = ReviewRequest {
            proposed_reply: "What do you think 47 + 28 is?".to_string(),
            conversation_history: vec![],
            last_user_text: "47 + 28".to_string(),
            age: 10,
            language: "en".to_string(),
        };
        let with_trace = Engine::new(EngineConfig::default()).review(&request);
        assert!(with_trace.reply.ends_with("40 + 20 = __"));
        assert_eq!(with_trace.trace.unwrap().len(), 3);

        let quiet = Engine::new(EngineConfig {
            policy_trace: false,
            ..EngineConfig::default()
        })
        .review(&request);
        assert!(quiet.trace.is_none());
    }
}
