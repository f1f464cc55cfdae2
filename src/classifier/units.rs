//! Unit-bearing add/subtract phrases
//!
//! `3 kg + 250 g`, `€2.50 + €1.25`, `1 uur - 15 min`. Both sides are
//! converted to the smaller unit of the pair so the usual tens/ones
//! decomposition applies to whole numbers.

use crate::numbers::{parse_number, to_whole};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const UNIT_ALT: &str = "hours|hour|hrs|hr|uur|h|minutes|minute|minuten|minuut|mins|min|euros|euro|eur|cents|cent|ct|kilograms|kilogram|kilo|kg|grams|gram|gr|g|litres|litre|liters|liter|l|cl|ml|kilometers|kilometer|km|meters|meter|metres|metre|mm|cm|m";

static UNIT_SUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(€\s*)?(\d+(?:\.\d+)?)\s*(?:({UNIT_ALT})\b)?\s*([+-])\s*(€\s*)?(\d+(?:\.\d+)?)\s*(?:({UNIT_ALT})\b)?"
    ))
    .expect("hardcoded regex")
});

static UNIT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^(?:{UNIT_ALT})$")).expect("hardcoded regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    Time,
    Money,
    Mass,
    Volume,
    Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Hour,
    Minute,
    Euro,
    Cent,
    Kilogram,
    Gram,
    Liter,
    Centiliter,
    Milliliter,
    Kilometer,
    Meter,
    Centimeter,
    Millimeter,
}

impl Unit {
    fn from_word(word: &str) -> Option<Self> {
        let unit = match word {
            "hours" | "hour" | "hrs" | "hr" | "uur" | "h" => Unit::Hour,
            "minutes" | "minute" | "minuten" | "minuut" | "mins" | "min" => Unit::Minute,
            "euros" | "euro" | "eur" | "€" => Unit::Euro,
            "cents" | "cent" | "ct" => Unit::Cent,
            "kilograms" | "kilogram" | "kilo" | "kg" => Unit::Kilogram,
            "grams" | "gram" | "gr" | "g" => Unit::Gram,
            "litres" | "litre" | "liters" | "liter" | "l" => Unit::Liter,
            "cl" => Unit::Centiliter,
            "ml" => Unit::Milliliter,
            "kilometers" | "kilometer" | "km" => Unit::Kilometer,
            "meters" | "meter" | "metres" | "metre" | "m" => Unit::Meter,
            "cm" => Unit::Centimeter,
            "mm" => Unit::Millimeter,
            _ => return None,
        };
        Some(unit)
    }

    pub fn family(self) -> UnitFamily {
        match self {
            Unit::Hour | Unit::Minute => UnitFamily::Time,
            Unit::Euro | Unit::Cent => UnitFamily::Money,
            Unit::Kilogram | Unit::Gram => UnitFamily::Mass,
            Unit::Liter | Unit::Centiliter | Unit::Milliliter => UnitFamily::Volume,
            Unit::Kilometer | Unit::Meter | Unit::Centimeter | Unit::Millimeter => {
                UnitFamily::Distance
            }
        }
    }

    /// Smallest unit of the family
    fn base(self) -> Unit {
        match self.family() {
            UnitFamily::Time => Unit::Minute,
            UnitFamily::Money => Unit::Cent,
            UnitFamily::Mass => Unit::Gram,
            UnitFamily::Volume => Unit::Milliliter,
            UnitFamily::Distance => Unit::Millimeter,
        }
    }

    /// Size expressed in the smallest unit of the family
    fn factor(self) -> i64 {
        match self {
            Unit::Hour => 60,
            Unit::Euro => 100,
            Unit::Kilogram | Unit::Liter | Unit::Meter => 1000,
            Unit::Centiliter | Unit::Centimeter => 10,
            Unit::Kilometer => 1_000_000,
            Unit::Minute | Unit::Cent | Unit::Gram | Unit::Milliliter | Unit::Millimeter => 1,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Hour => "h",
            Unit::Minute => "min",
            Unit::Euro => "euro",
            Unit::Cent => "ct",
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Liter => "l",
            Unit::Centiliter => "cl",
            Unit::Milliliter => "ml",
            Unit::Kilometer => "km",
            Unit::Meter => "m",
            Unit::Centimeter => "cm",
            Unit::Millimeter => "mm",
        }
    }
}

/// Whether a word is a unit name the classifier understands
pub fn is_unit_word(word: &str) -> bool {
    UNIT_WORD.is_match(word)
}

/// A recognized `n unit ± n unit` phrase, already in the smaller unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSum {
    pub a: i64,
    pub b: i64,
    pub subtract: bool,
    pub unit: Unit,
}

/// Find a unit-bearing sum or difference in normalized text.
pub fn find_unit_sum(text: &str) -> Option<UnitSum> {
    let caps = UNIT_SUM.captures(text)?;
    let unit_of = |euro: Option<regex::Match<'_>>, word: Option<regex::Match<'_>>| {
        match (euro, word) {
            (Some(_), _) => Some(Unit::Euro),
            (None, Some(w)) => Unit::from_word(w.as_str()),
            (None, None) => None,
        }
    };
    let left_unit = unit_of(caps.get(1), caps.get(3))?;
    let right_unit = unit_of(caps.get(5), caps.get(7))?;
    if left_unit.family() != right_unit.family() {
        return None;
    }

    let left = parse_number(caps.get(2)?.as_str())?;
    let right = parse_number(caps.get(6)?.as_str())?;
    let subtract = caps.get(4)?.as_str() == "-";
    let smaller = if left_unit.factor() <= right_unit.factor() {
        left_unit
    } else {
        right_unit
    };

    // Prefer the smaller unit of the pair; drop to the family's base unit
    // when that is the only way to get whole numbers (€2.50 -> 250 ct).
    [smaller, smaller.base()].into_iter().find_map(|unit| {
        Some(UnitSum {
            a: convert(left, left_unit, unit)?,
            b: convert(right, right_unit, unit)?,
            subtract,
            unit,
        })
    })
}

#[allow(clippy::cast_precision_loss)]
fn convert(value: f64, from: Unit, to: Unit) -> Option<i64> {
    let ratio = from.factor() / to.factor();
    to_whole(value * ratio as f64)
}
