//! Engine configuration

use crate::language::Language;

/// Settings read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Used when a request carries an unrecognized language code
    pub default_language: Language,
    /// Learner age assumed by the session driver
    pub default_age: u32,
    /// Keep the rule trace in reviewed replies
    pub policy_trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_language: Language::Nl,
            default_age: 10,
            policy_trace: true,
        }
    }
}

impl EngineConfig {
    /// Load from `TUTOR_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            default_language: lookup("TUTOR_DEFAULT_LANGUAGE")
                .and_then(|tag| Language::from_tag(&tag))
                .unwrap_or(defaults.default_language),
            default_age: lookup("TUTOR_DEFAULT_AGE")
                .and_then(|age| age.trim().parse().ok())
                .unwrap_or(defaults.default_age),
            policy_trace: lookup("TUTOR_POLICY_TRACE")
                .map_or(defaults.policy_trace, |v| {
                    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
                }),
        }
    }
}
