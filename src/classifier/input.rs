//! What kind of reply a student gave to a pending micro-step

use crate::language::Language;
use crate::lexicon::Lexicon;
use crate::numbers::parse_number;
use regex::Regex;
use std::sync::LazyLock;

/// Up to three lead-in words ("het is", "i think"), an optional `=`/`:`,
/// the number, an optional unit word and closing punctuation.
static ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\p{L}']+\s+){0,3}[:=]?\s*(-?\d+(?:[.,]\d+)?)\s*(?:[\p{L}€]+)?\s*[.!?]*$")
        .expect("hardcoded regex")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StudentInput {
    /// A single numeric answer
    Answer(f64),
    /// "I don't know", "help", "???"
    Stuck,
    /// Bare yes/no
    YesNo,
    /// "ok", "thanks"
    Ack,
    Other,
}

impl StudentInput {
    pub fn classify(text: &str, lang: Language, lexicon: &Lexicon) -> Self {
        if let Some(value) = extract_answer(text) {
            return StudentInput::Answer(value);
        }
        if lexicon.is_stuck(lang, text) {
            return StudentInput::Stuck;
        }
        if lexicon.is_yes_no(lang, text) {
            return StudentInput::YesNo;
        }
        if lexicon.is_ack(lang, text) {
            return StudentInput::Ack;
        }
        StudentInput::Other
    }
}

/// Pull a single numeric answer out of a short reply.
///
/// `"60"`, `"= 60"`, `"het is 60!"`, `"40 + 20 = 60"` all yield 60.
pub fn extract_answer(text: &str) -> Option<f64> {
    let lowered = text.trim().to_lowercase().replace(['−', '–'], "-");
    // An echoed computation: only the part after the last '=' counts
    let tail = lowered.rsplit('=').next().unwrap_or_default().trim();
    let candidate = if tail.is_empty() { lowered.as_str() } else { tail };
    let caps = ANSWER.captures(candidate)?;
    parse_number(caps.get(1)?.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_and_decorated_answers() {
        assert_eq!(extract_answer("60"), Some(60.0));
        assert_eq!(extract_answer("= 60"), Some(60.0));
        assert_eq!(extract_answer("het is 60!"), Some(60.0));
        assert_eq!(extract_answer("I think it's 15"), Some(15.0));
        assert_eq!(extract_answer("40 + 20 = 60"), Some(60.0));
        assert_eq!(extract_answer("2,5"), Some(2.5));
        assert_eq!(extract_answer("−6"), Some(-6.0));
        assert_eq!(extract_answer("75 kg"), Some(75.0));
        assert_eq!(extract_answer("60?"), Some(60.0));
    }

    #[test]
    fn test_extract_rejects_non_answers() {
        assert_eq!(extract_answer("47 + 28"), None);
        assert_eq!(extract_answer("I don't know"), None);
        assert_eq!(extract_answer("maybe 60 or 70"), None);
        assert_eq!(extract_answer("ok"), None);
    }

    #[test]
    fn test_classify_input_kinds() {
        let lex = Lexicon::shared();
        assert_eq!(StudentInput::classify("60", Language::En, lex), StudentInput::Answer(60.0));
        assert_eq!(StudentInput::classify("no idea", Language::En, lex), StudentInput::Stuck);
        assert_eq!(StudentInput::classify("ja", Language::Nl, lex), StudentInput::YesNo);
        assert_eq!(StudentInput::classify("ok thanks", Language::En, lex), StudentInput::Ack);
        assert_eq!(
            StudentInput::classify("tell me about dinosaurs", Language::En, lex),
            StudentInput::Other
        );
    }
}
