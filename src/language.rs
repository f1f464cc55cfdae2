//! Language tags and learner age bands

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recognized language codes (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Nl,
    En,
    Es,
    De,
    Fr,
    It,
    Pt,
    Da,
    Sv,
    No,
    Fi,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::Nl,
        Language::En,
        Language::Es,
        Language::De,
        Language::Fr,
        Language::It,
        Language::Pt,
        Language::Da,
        Language::Sv,
        Language::No,
        Language::Fi,
    ];

    /// Parse a caller-supplied tag such as `en`, `EN`, `en-GB` or `nb_NO`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "nl" => Some(Language::Nl),
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            "de" => Some(Language::De),
            "fr" => Some(Language::Fr),
            "it" => Some(Language::It),
            "pt" => Some(Language::Pt),
            "da" => Some(Language::Da),
            "sv" => Some(Language::Sv),
            // Bokmål and Nynorsk share the Norwegian tables
            "no" | "nb" | "nn" => Some(Language::No),
            "fi" => Some(Language::Fi),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Nl => "nl",
            Language::En => "en",
            Language::Es => "es",
            Language::De => "de",
            Language::Fr => "fr",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Da => "da",
            Language::Sv => "sv",
            Language::No => "no",
            Language::Fi => "fi",
        }
    }

    /// Math phrasing only distinguishes Dutch and English; everything else
    /// falls back to Dutch.
    pub fn phrasing(self) -> Phrasing {
        match self {
            Language::En => Phrasing::En,
            _ => Phrasing::Nl,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which phrase table the coach renders from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrasing {
    Nl,
    En,
}

/// Learner age bucket. Governs phrasing only, never the math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AgeBand {
    /// 12 and under
    Junior,
    /// 13 to 16
    Teen,
    /// 17 and over
    Student,
}

impl AgeBand {
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=12 => AgeBand::Junior,
            13..=16 => AgeBand::Teen,
            _ => AgeBand::Student,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_variants() {
        assert_eq!(Language::from_tag("en"), Some(Language::En));
        assert_eq!(Language::from_tag("EN-gb"), Some(Language::En));
        assert_eq!(Language::from_tag("nb_NO"), Some(Language::No));
        assert_eq!(Language::from_tag("pl"), None);
        assert_eq!(Language::from_tag(""), None);
    }

    #[test]
    fn test_every_code_round_trips() {
        for lang in Language::ALL {
            assert_eq!(Language::from_tag(lang.code()), Some(lang));
        }
    }

    #[test]
    fn test_phrasing_falls_back_to_dutch() {
        assert_eq!(Language::En.phrasing(), Phrasing::En);
        assert_eq!(Language::Nl.phrasing(), Phrasing::Nl);
        assert_eq!(Language::De.phrasing(), Phrasing::Nl);
    }

    #[test]
    fn test_age_band_boundaries() {
        assert_eq!(AgeBand::from_age(6), AgeBand::Junior);
        assert_eq!(AgeBand::from_age(12), AgeBand::Junior);
        assert_eq!(AgeBand::from_age(13), AgeBand::Teen);
        assert_eq!(AgeBand::from_age(16), AgeBand::Teen);
        assert_eq!(AgeBand::from_age(17), AgeBand::Student);
        assert_eq!(AgeBand::from_age(45), AgeBand::Student);
    }
}
