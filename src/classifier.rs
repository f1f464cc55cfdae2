//! Problem classifier
//!
//! Maps free text to a typed [`Problem`] using a fixed priority order,
//! because several pattern classes are textual supersets of others:
//!
//! 1. unary-negative expressions -> `negatives`
//! 2. parentheses or two or more operators -> `order_ops`
//! 3. "p% of n" -> `percent`
//! 4. unit-bearing sums/differences -> `add`/`sub` with a unit
//! 5. "simplify" keyword with `n/d` -> `frac`
//! 6. bare `n/d` -> `div`
//! 7. `a*b` -> `mul`
//! 8. `a+b`, `a-b` -> `add`/`sub`
//! 9. `__ + b = c` and friends -> `unknown`
//!
//! Pure functions only.

mod input;
mod units;

pub use input::{extract_answer, StudentInput};
pub use units::Unit;

use crate::expr::{self, Op, Token};
use crate::language::Phrasing;
use crate::lexicon::Lexicon;
use crate::numbers::{format_number, parse_number, to_whole};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static EXPRESSION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9.+\-*/() ]+").expect("hardcoded regex"));

static TIMES_BETWEEN_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s*[x×·]\s*(\d)").expect("hardcoded regex"));

static COLON_BETWEEN_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s*:\s*(\d)").expect("hardcoded regex"));

static RICHER_NOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\^|√|²|³|\*\*|\bsqrt\b|\bwortel\b|\blog\b|\bsin\b|\bcos\b|\btan\b")
        .expect("hardcoded regex")
});

static PERCENT_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:%|procent\b|percent\b)\s*(?:of|van)\s*(?:€\s*)?(\d+(?:\.\d+)?)")
        .expect("hardcoded regex")
});

static SIMPLIFY_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:simplif\w*|reduce|vereenvoudig\w*|breuk\w*|fraction\w*)")
        .expect("hardcoded regex")
});

static UNKNOWN_BLANK_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:_+|\?|…|\.\.\.|\bx\b|\bn\b)\s*([+-])\s*(\d+)\s*=\s*(-?\d+)")
        .expect("hardcoded regex")
});

static UNKNOWN_BLANK_SECOND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*([+-])\s*(?:_+|\?|…|\.\.\.|\bx\b|\bn\b)\s*=\s*(-?\d+)")
        .expect("hardcoded regex")
});

static ANSWERED_EQUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*-?\d").expect("hardcoded regex"));

static BLANK_MARKERS: &[&str] = &["x", "n", "_", "__", "___"];

/// A classified problem statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    Add {
        a: i64,
        b: i64,
        #[serde(default)]
        unit: Option<Unit>,
    },
    Sub {
        a: i64,
        b: i64,
        #[serde(default)]
        unit: Option<Unit>,
    },
    Mul {
        a: i64,
        b: i64,
    },
    Div {
        a: i64,
        b: i64,
    },
    Frac {
        numerator: i64,
        denominator: i64,
    },
    Percent {
        percent: f64,
        base: f64,
    },
    /// Canonical ASCII expression
    OrderOps {
        expr: String,
    },
    /// Canonical ASCII expression containing a negative literal
    Negatives {
        expr: String,
    },
    /// One missing term: `__ + 5 = 12` (`blank_first`) or `7 + __ = 12`
    Unknown {
        op: Op,
        known: i64,
        result: i64,
        blank_first: bool,
    },
}

impl Problem {
    pub fn kind(&self) -> &'static str {
        match self {
            Problem::Add { .. } => "add",
            Problem::Sub { .. } => "sub",
            Problem::Mul { .. } => "mul",
            Problem::Div { .. } => "div",
            Problem::Frac { .. } => "frac",
            Problem::Percent { .. } => "percent",
            Problem::OrderOps { .. } => "order_ops",
            Problem::Negatives { .. } => "negatives",
            Problem::Unknown { .. } => "unknown",
        }
    }

    /// The problem as shown back to the learner
    pub fn describe(&self, phrasing: Phrasing) -> String {
        let with_unit = |n: i64, unit: Option<Unit>| match unit {
            Some(u) => format!("{n} {}", u.symbol()),
            None => n.to_string(),
        };
        match self {
            Problem::Add { a, b, unit } => {
                format!("{} + {}", with_unit(*a, *unit), with_unit(*b, *unit))
            }
            Problem::Sub { a, b, unit } => {
                format!("{} − {}", with_unit(*a, *unit), with_unit(*b, *unit))
            }
            Problem::Mul { a, b } => format!("{a} × {b}"),
            Problem::Div { a, b } => format!("{a} ÷ {b}"),
            Problem::Frac {
                numerator,
                denominator,
            } => format!("{numerator}/{denominator}"),
            Problem::Percent { percent, base } => {
                let of = match phrasing {
                    Phrasing::Nl => "van",
                    Phrasing::En => "of",
                };
                format!("{}% {of} {}", format_number(*percent), format_number(*base))
            }
            Problem::OrderOps { expr } | Problem::Negatives { expr } => expr::display_str(expr),
            Problem::Unknown {
                op,
                known,
                result,
                blank_first,
            } => {
                if *blank_first {
                    format!("? {} {known} = {result}", op.symbol())
                } else {
                    format!("{known} {} ? = {result}", op.symbol())
                }
            }
        }
    }
}

/// Lowercase and map the many ways students write operators onto
/// `+ - * /`.
pub fn normalize_math_text(text: &str) -> String {
    let lowered = text
        .to_lowercase()
        .replace(['−', '–'], "-")
        .replace('÷', "/");
    let lowered = crate::numbers::normalize_decimal_comma(&lowered);
    let lowered = TIMES_BETWEEN_DIGITS.replace_all(&lowered, "$1 * $2");
    let lowered = COLON_BETWEEN_DIGITS.replace_all(&lowered, "$1 / $2");
    lowered.replace('×', "*")
}

/// Classify free text as a problem statement.
pub fn classify(text: &str) -> Option<Problem> {
    let norm = normalize_math_text(text);
    if RICHER_NOTATION.is_match(&norm) {
        return None;
    }

    let tokens = find_expression(&norm);

    if let Some(tokens) = &tokens {
        if expr::has_negative_literal(tokens) {
            return Some(Problem::Negatives {
                expr: expr::to_canonical(tokens),
            });
        }
        if expr::has_parens(tokens) || expr::operator_count(tokens) >= 2 {
            return Some(Problem::OrderOps {
                expr: expr::to_canonical(tokens),
            });
        }
    }

    if let Some(problem) = classify_percent(&norm) {
        return Some(problem);
    }

    if let Some(sum) = units::find_unit_sum(&norm) {
        return Some(if sum.subtract {
            Problem::Sub {
                a: sum.a,
                b: sum.b,
                unit: Some(sum.unit),
            }
        } else {
            Problem::Add {
                a: sum.a,
                b: sum.b,
                unit: Some(sum.unit),
            }
        });
    }

    if let Some(tokens) = &tokens {
        if let Some(problem) = classify_binary(tokens, SIMPLIFY_KEYWORD.is_match(&norm)) {
            return Some(problem);
        }
    }

    classify_unknown(&norm)
}

/// Whether `text` is a problem statement on its own, as opposed to a
/// problem mentioned inside a longer sentence or an echoed, already
/// answered computation.
pub fn is_standalone_problem_statement(text: &str, lexicon: &Lexicon) -> bool {
    let Some(problem) = classify(text) else {
        return false;
    };
    let norm = normalize_math_text(text).replace(['\'', '\u{2019}'], "");
    if !matches!(problem, Problem::Unknown { .. }) && ANSWERED_EQUATION.is_match(&norm) {
        return false;
    }

    let words: Vec<&str> = norm
        .split(|c: char| !(c.is_alphabetic() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect();
    words.len() <= 12
        && words.iter().all(|word| {
            lexicon.is_filler(word) || units::is_unit_word(word) || BLANK_MARKERS.contains(word)
        })
}

/// First run of math characters that tokenizes into an expression with at
/// least one operator.
fn find_expression(norm: &str) -> Option<Vec<Token>> {
    EXPRESSION_RUN.find_iter(norm).find_map(|m| {
        let candidate = m.as_str().trim().trim_end_matches('.');
        let tokens = expr::tokenize(candidate).ok()?;
        (expr::operator_count(&tokens) >= 1).then_some(tokens)
    })
}

fn classify_percent(norm: &str) -> Option<Problem> {
    let caps = PERCENT_OF.captures(norm)?;
    let percent = parse_number(caps.get(1)?.as_str())?;
    let base = parse_number(caps.get(2)?.as_str())?;
    (percent > 0.0 && base >= 0.0).then_some(Problem::Percent { percent, base })
}

fn classify_binary(tokens: &[Token], simplify: bool) -> Option<Problem> {
    let [Token::Num(left), Token::Op(op), Token::Num(right)] = tokens else {
        return None;
    };
    let a = to_whole(*left)?;
    let b = to_whole(*right)?;
    if a < 0 || b < 0 {
        return None;
    }
    match op {
        Op::Div if simplify => (a > 0 && b > 0).then_some(Problem::Frac {
            numerator: a,
            denominator: b,
        }),
        Op::Div => (b > 0).then_some(Problem::Div { a, b }),
        Op::Mul => Some(Problem::Mul { a, b }),
        Op::Add => Some(Problem::Add { a, b, unit: None }),
        Op::Sub => Some(Problem::Sub { a, b, unit: None }),
    }
}

fn classify_unknown(norm: &str) -> Option<Problem> {
    let op_of = |s: &str| if s == "-" { Op::Sub } else { Op::Add };
    let term = |m: Option<regex::Match<'_>>| parse_number(m?.as_str()).and_then(to_whole);
    if let Some(caps) = UNKNOWN_BLANK_FIRST.captures(norm) {
        return Some(Problem::Unknown {
            op: op_of(caps.get(1)?.as_str()),
            known: term(caps.get(2))?,
            result: term(caps.get(3))?,
            blank_first: true,
        });
    }
    let caps = UNKNOWN_BLANK_SECOND.captures(norm)?;
    Some(Problem::Unknown {
        op: op_of(caps.get(2)?.as_str()),
        known: term(caps.get(1))?,
        result: term(caps.get(3))?,
        blank_first: false,
    })
}
