//! Flat tokenizer and single-step evaluator
//!
//! Expressions stay a flat `Vec<Token>`; there is no parse tree. Each call to
//! [`next_reduction`] picks exactly one `number op number` triple: inside the
//! innermost parenthesized span (or the whole expression), multiply/divide
//! before add/subtract, left to right.

use crate::error::ExprError;
use crate::numbers::{display_number, MAX_OPERAND};
use serde::{Deserialize, Serialize};

/// The four supported binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn apply(self, left: f64, right: f64) -> Result<f64, ExprError> {
        let value = match self {
            Op::Add => left + right,
            Op::Sub => left - right,
            Op::Mul => left * right,
            Op::Div => {
                if right.abs() < f64::EPSILON {
                    return Err(ExprError::DivisionByZero);
                }
                left / right
            }
        };
        if value.is_finite() && value.abs() <= MAX_OPERAND {
            Ok(value)
        } else {
            Err(ExprError::NonFinite)
        }
    }

    /// Symbol shown to learners
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "−",
            Op::Mul => "×",
            Op::Div => "÷",
        }
    }

    fn ascii(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    pub fn binds_tight(self) -> bool {
        matches!(self, Op::Mul | Op::Div)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Num(f64),
    Op(Op),
    LParen,
    RParen,
}

/// One `left op right` computation picked for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    /// Token index of the left operand
    pub start: usize,
    pub left: f64,
    pub op: Op,
    pub right: f64,
}

impl Reduction {
    pub fn value(&self) -> Result<f64, ExprError> {
        self.op.apply(self.left, self.right)
    }

    /// `3 × 4`, `5 − (−6)`
    pub fn display(&self) -> String {
        let right = if self.right < 0.0 {
            format!("({})", display_number(self.right))
        } else {
            display_number(self.right)
        };
        format!("{} {} {right}", display_number(self.left), self.op.symbol())
    }
}

/// Tokenize, validate and collapse singleton parentheses.
pub fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let (value, next) = read_number(&chars, i)?;
                tokens.push(Token::Num(value));
                i = next;
            }
            '-' | '−' | '–' if expects_operand(tokens.last()) => {
                // Unary minus binds to the number that follows
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j >= chars.len() || !(chars[j].is_ascii_digit() || chars[j] == '.') {
                    return Err(ExprError::Malformed);
                }
                let (value, next) = read_number(&chars, j)?;
                tokens.push(Token::Num(-value));
                i = next;
            }
            '+' => {
                tokens.push(Token::Op(Op::Add));
                i += 1;
            }
            '-' | '−' | '–' => {
                tokens.push(Token::Op(Op::Sub));
                i += 1;
            }
            '*' | '×' | '·' => {
                tokens.push(Token::Op(Op::Mul));
                i += 1;
            }
            '/' | '÷' | ':' => {
                tokens.push(Token::Op(Op::Div));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    validate(&tokens)?;
    Ok(collapse_singletons(tokens))
}

fn expects_operand(prev: Option<&Token>) -> bool {
    matches!(prev, None | Some(Token::Op(_) | Token::LParen))
}

fn read_number(chars: &[char], start: usize) -> Result<(f64, usize), ExprError> {
    let mut end = start;
    while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == '.') {
        end += 1;
    }
    let literal: String = chars[start..end].iter().collect();
    let value: f64 = literal.parse().map_err(|_| ExprError::Malformed)?;
    if !value.is_finite() || value.abs() > MAX_OPERAND {
        return Err(ExprError::NonFinite);
    }
    Ok((value, end))
}

/// Operands and operators must alternate; parentheses must balance and
/// never be empty.
fn validate(tokens: &[Token]) -> Result<(), ExprError> {
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut depth: usize = 0;
    let mut want_operand = true;
    for token in tokens {
        match token {
            Token::Num(_) => {
                if !want_operand {
                    return Err(ExprError::Malformed);
                }
                want_operand = false;
            }
            Token::Op(_) => {
                if want_operand {
                    return Err(ExprError::Malformed);
                }
                want_operand = true;
            }
            Token::LParen => {
                if !want_operand {
                    return Err(ExprError::Malformed);
                }
                depth += 1;
            }
            Token::RParen => {
                if want_operand {
                    return Err(ExprError::Malformed);
                }
                depth = depth.checked_sub(1).ok_or(ExprError::UnbalancedParens)?;
            }
        }
    }
    if depth != 0 {
        return Err(ExprError::UnbalancedParens);
    }
    if want_operand {
        return Err(ExprError::Malformed);
    }
    Ok(())
}

/// Replace every `( n )` with `n` until none remain.
pub fn collapse_singletons(mut tokens: Vec<Token>) -> Vec<Token> {
    loop {
        let found = tokens.windows(3).position(|w| {
            matches!(w, [Token::LParen, Token::Num(_), Token::RParen])
        });
        match found {
            Some(i) => {
                tokens.remove(i + 2);
                tokens.remove(i);
            }
            None => return tokens,
        }
    }
}

/// Pick the single computation to ask for next, or `None` when the
/// expression is already one number.
pub fn next_reduction(tokens: &[Token]) -> Option<Reduction> {
    let (lo, hi) = innermost_span(tokens);
    let span = tokens.get(lo..hi)?;

    let pick = |tight: bool| {
        span.iter().enumerate().find_map(|(k, token)| match token {
            Token::Op(op) if op.binds_tight() == tight && k > 0 => {
                match (span.get(k - 1), span.get(k + 1)) {
                    (Some(Token::Num(left)), Some(Token::Num(right))) => Some(Reduction {
                        start: lo + k - 1,
                        left: *left,
                        op: *op,
                        right: *right,
                    }),
                    _ => None,
                }
            }
            _ => None,
        })
    };

    pick(true).or_else(|| pick(false))
}

/// Bounds of the innermost parenthesized span (exclusive of the parens),
/// or the whole token list when there are none.
fn innermost_span(tokens: &[Token]) -> (usize, usize) {
    let Some(close) = tokens.iter().position(|t| matches!(t, Token::RParen)) else {
        return (0, tokens.len());
    };
    let open = tokens
        .get(..close)
        .and_then(|head| head.iter().rposition(|t| matches!(t, Token::LParen)))
        .unwrap_or(0);
    (open + 1, close)
}

/// Apply a reduction picked by [`next_reduction`] and collapse any
/// parentheses left around a single number.
pub fn apply_reduction(tokens: &[Token], reduction: &Reduction) -> Result<Vec<Token>, ExprError> {
    let value = reduction.value()?;
    let end = reduction.start + 3;
    if end > tokens.len() {
        return Err(ExprError::Malformed);
    }
    let mut out = Vec::with_capacity(tokens.len() - 2);
    out.extend_from_slice(&tokens[..reduction.start]);
    out.push(Token::Num(value));
    out.extend_from_slice(&tokens[end..]);
    Ok(collapse_singletons(out))
}

/// Reduce to a single value.
pub fn evaluate(tokens: &[Token]) -> Result<f64, ExprError> {
    let mut current = tokens.to_vec();
    while let Some(reduction) = next_reduction(&current) {
        current = apply_reduction(&current, &reduction)?;
    }
    match current.as_slice() {
        [Token::Num(value)] => Ok(*value),
        _ => Err(ExprError::Malformed),
    }
}

pub fn single_value(tokens: &[Token]) -> Option<f64> {
    match tokens {
        [Token::Num(value)] => Some(*value),
        _ => None,
    }
}

pub fn operator_count(tokens: &[Token]) -> usize {
    tokens.iter().filter(|t| matches!(t, Token::Op(_))).count()
}

pub fn has_parens(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| matches!(t, Token::LParen))
}

pub fn has_negative_literal(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| matches!(t, Token::Num(v) if *v < 0.0))
}

/// ASCII form stored in conversation state; tokenizes back to the same
/// tokens, bit for bit.
pub fn to_canonical(tokens: &[Token]) -> String {
    render(tokens, |op| op.ascii().to_string(), canonical_number)
}

/// Shortest form that parses back to the same `f64`; never `-0`.
fn canonical_number(value: f64) -> String {
    if value.abs() < f64::MIN_POSITIVE {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

/// Learner-facing form with `×`, `÷` and `−`.
pub fn display(tokens: &[Token]) -> String {
    render(tokens, |op| op.symbol().to_string(), display_number)
}

/// Learner-facing form of a canonical expression string. Falls back to the
/// input when it does not tokenize.
pub fn display_str(canonical: &str) -> String {
    tokenize(canonical).map_or_else(|_| canonical.to_string(), |t| display(&t))
}

fn render(
    tokens: &[Token],
    op_text: impl Fn(Op) -> String,
    num_text: impl Fn(f64) -> String,
) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Num(v) => {
                let text = num_text(*v);
                let after_op = i > 0 && matches!(tokens[i - 1], Token::Op(_));
                if *v < 0.0 && after_op {
                    out.push('(');
                    out.push_str(&text);
                    out.push(')');
                } else {
                    out.push_str(&text);
                }
            }
            Token::Op(op) => {
                out.push(' ');
                out.push_str(&op_text(*op));
                out.push(' ');
            }
            Token::LParen => out.push('('),
            Token::RParen => out.push(')'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reduce_all(text: &str) -> Vec<String> {
        let mut tokens = tokenize(text).unwrap();
        let mut steps = Vec::new();
        while let Some(r) = next_reduction(&tokens) {
            steps.push(r.display());
            tokens = apply_reduction(&tokens, &r).unwrap();
        }
        steps
    }

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("3 + 4 * 2").unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(operator_count(&tokens), 2);
    }

    #[test]
    fn test_tokenize_unary_minus() {
        let tokens = tokenize("-7 + 12").unwrap();
        assert_eq!(tokens[0], Token::Num(-7.0));
        let tokens = tokenize("5 - -3").unwrap();
        assert_eq!(tokens, vec![Token::Num(5.0), Token::Op(Op::Sub), Token::Num(-3.0)]);
        assert!(has_negative_literal(&tokens));
    }

    #[test]
    fn test_tokenize_collapses_singleton_parens() {
        let tokens = tokenize("5 + (-3)").unwrap();
        assert_eq!(tokens, vec![Token::Num(5.0), Token::Op(Op::Add), Token::Num(-3.0)]);
        assert!(!has_parens(&tokens));
    }

    #[test]
    fn test_tokenize_rejects_residue() {
        assert_eq!(tokenize("3 + x"), Err(ExprError::UnexpectedChar('x')));
        assert_eq!(tokenize("(3 + 4"), Err(ExprError::UnbalancedParens));
        assert_eq!(tokenize("3 +"), Err(ExprError::Malformed));
        assert_eq!(tokenize("3 4"), Err(ExprError::Malformed));
        assert_eq!(tokenize("2 ^ 3"), Err(ExprError::UnexpectedChar('^')));
        assert_eq!(tokenize("  "), Err(ExprError::Empty));
        assert_eq!(tokenize("-(3 + 4)"), Err(ExprError::Malformed));
    }

    #[test]
    fn test_precedence_one_step_per_turn() {
        assert_eq!(reduce_all("3 + 4 * 2"), vec!["4 × 2", "3 + 8"]);
        assert_eq!(reduce_all("10 - 3 + 2"), vec!["10 − 3", "7 + 2"]);
        assert_eq!(reduce_all("12 / 4 * 3"), vec!["12 ÷ 4", "3 × 3"]);
    }

    #[test]
    fn test_innermost_parens_first() {
        assert_eq!(
            reduce_all("2 * (3 + (4 - 1))"),
            vec!["4 − 1", "3 + 3", "2 × 6"]
        );
        assert_eq!(reduce_all("(2 + 3) * (4 + 1)"), vec!["2 + 3", "4 + 1", "5 × 5"]);
    }

    #[test]
    fn test_negative_intermediate_renders_in_parens() {
        let tokens = tokenize("2 * (3 - 5)").unwrap();
        let r = next_reduction(&tokens).unwrap();
        let next = apply_reduction(&tokens, &r).unwrap();
        assert_eq!(to_canonical(&next), "2 * (-2)");
        assert_eq!(display(&next), "2 × (−2)");
        assert_eq!(tokenize(&to_canonical(&next)).unwrap(), next);
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let tokens = tokenize("4 / (2 - 2)").unwrap();
        assert_eq!(evaluate(&tokens), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate(&tokenize("3 + 4 * (2 - 1)").unwrap()), Ok(7.0));
        assert_eq!(single_value(&tokenize("(42)").unwrap()), Some(42.0));
    }

    proptest! {
        #[test]
        fn prop_canonical_form_round_trips(
            a in 0i64..1000, b in 1i64..1000, c in 0i64..1000,
            ops in proptest::collection::vec(0usize..4, 2)
        ) {
            let sym = ['+', '-', '*', '/'];
            let text = format!("{a} {} ({b} {} {c})", sym[ops[0]], sym[ops[1]]);
            if let Ok(tokens) = tokenize(&text) {
                let canonical = to_canonical(&tokens);
                prop_assert_eq!(tokenize(&canonical).unwrap(), tokens);
            }
        }

        #[test]
        fn prop_each_reduction_removes_one_operator(
            a in 0i64..100, b in 1i64..100, c in 1i64..100
        ) {
            let tokens = tokenize(&format!("{a} + {b} * {c} - {a}")).unwrap();
            let mut current = tokens;
            let mut remaining = operator_count(&current);
            while let Some(r) = next_reduction(&current) {
                current = apply_reduction(&current, &r).unwrap();
                prop_assert_eq!(operator_count(&current), remaining - 1);
                remaining -= 1;
            }
            prop_assert_eq!(remaining, 0);
        }
    }
}
