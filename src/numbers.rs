//! Number parsing, formatting and tolerant comparison
//!
//! Every answer check in the engine goes through [`matches_expected`], which
//! uses the fixed [`TOLERANCE`]. Skills never relax it.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

/// Absolute epsilon used for all answer-equality comparisons
pub const TOLERANCE: f64 = 1e-9;

/// Largest magnitude the engine will plan with; beyond this `f64` stops
/// representing whole numbers exactly.
pub const MAX_OPERAND: f64 = 1e12;

/// [`MAX_OPERAND`] for the whole-number planners
pub const MAX_WHOLE: i64 = 1_000_000_000_000;

/// Whether a whole operand is inside the planning range
pub fn whole_in_range(n: i64) -> bool {
    (-MAX_WHOLE..=MAX_WHOLE).contains(&n)
}

/// Compare a student's answer with the expected value of a step.
pub fn matches_expected(answer: f64, expected: f64) -> bool {
    answer.is_finite() && expected.is_finite() && (answer - expected).abs() <= TOLERANCE
}

/// Parse a single number as a student would type it.
///
/// Accepts an optional sign, a decimal point or a decimal comma, and a
/// trailing `.`/`!`. Returns `None` for anything else, including non-finite
/// values.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_end_matches(['.', '!']).trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = normalize_decimal_comma(trimmed);
    let valid = normalized
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+')));
    if !valid
        || normalized.matches('.').count() > 1
        || !normalized.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }
    let value: f64 = normalized.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Replace a decimal comma between two digits with a point (`2,5` -> `2.5`).
pub fn normalize_decimal_comma(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let between_digits = i > 0
            && i + 1 < chars.len()
            && chars[i - 1].is_ascii_digit()
            && chars[i + 1].is_ascii_digit();
        if c == ',' && between_digits {
            out.push('.');
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether `value` is a whole number (within tolerance)
pub fn is_whole(value: f64) -> bool {
    value.is_finite() && (value - value.round()).abs() <= TOLERANCE
}

/// Convert a whole, in-range `f64` to `i64`.
pub fn to_whole(value: f64) -> Option<i64> {
    (is_whole(value) && value.abs() <= MAX_OPERAND).then(|| value.round() as i64)
}

/// Format a number without trailing noise: `60`, `2.5`, `-0.125`.
pub fn format_number(value: f64) -> String {
    if is_whole(value) {
        let rounded = value.round();
        // Avoid printing "-0"
        if rounded.abs() < 0.5 {
            return "0".to_string();
        }
        return format!("{}", rounded as i64);
    }
    let fixed = format!("{value:.6}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Learner-facing form of [`format_number`], with a typographic minus.
pub fn display_number(value: f64) -> String {
    format_number(value).replace('-', "−")
}

/// Split a non-negative whole number into its tens part and ones digit
/// (`147` -> `(140, 7)`).
pub fn split_tens(value: i64) -> (i64, i64) {
    let ones = value.rem_euclid(10);
    (value - ones, ones)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_integer() {
        assert_eq!(parse_number("60"), Some(60.0));
        assert_eq!(parse_number("  75 "), Some(75.0));
    }

    #[test]
    fn test_parse_decimal_comma_and_point() {
        assert_eq!(parse_number("2,5"), Some(2.5));
        assert_eq!(parse_number("2.5"), Some(2.5));
    }

    #[test]
    fn test_parse_signed_and_trailing_punctuation() {
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("15!"), Some(15.0));
        assert_eq!(parse_number("15."), Some(15.0));
    }

    #[test]
    fn test_parse_rejects_words_and_garbage() {
        assert_eq!(parse_number("sixty"), None);
        assert_eq!(parse_number("6 0"), None);
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_tolerance_absorbs_rounding() {
        assert!(matches_expected(0.1 + 0.2, 0.3));
        assert!(!matches_expected(0.31, 0.3));
        assert!(!matches_expected(f64::NAN, 0.0));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(60.0), "60");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.125), "-0.125");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_split_tens() {
        assert_eq!(split_tens(47), (40, 7));
        assert_eq!(split_tens(147), (140, 7));
        assert_eq!(split_tens(8), (0, 8));
    }

    #[test]
    fn test_to_whole() {
        assert_eq!(to_whole(12.0), Some(12));
        assert_eq!(to_whole(12.5), None);
        assert_eq!(to_whole(1e15), None);
    }

    #[test]
    fn test_whole_in_range() {
        assert!(whole_in_range(MAX_WHOLE));
        assert!(whole_in_range(-MAX_WHOLE));
        assert!(!whole_in_range(MAX_WHOLE + 1));
        assert!(!whole_in_range(i64::MIN));
        assert!(!whole_in_range(i64::MAX));
    }
}
