//! Evaluator configuration.
//!
//! Defaults reproduce plain recursive evaluation: every base is recomputed
//! each time it is reached and argument values are not logged.

use serde::{Deserialize, Serialize};

/// Environment variable enabling per-call memoisation of base results.
pub const MEMOIZE_BASES_ENV: &str = "DEFN_MEMOIZE_BASES";
/// Environment variable enabling `trace`-level argument logging.
pub const TRACE_ARGUMENTS_ENV: &str = "DEFN_TRACE_ARGUMENTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Cache base results within a single top-level call, keyed by base type
    /// and the attribute values it was instantiated with.
    pub memoize_bases: bool,
    /// Log the arguments handed to each definition body at `trace` level.
    pub trace_arguments: bool,
}

impl EvalConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`EvalConfig::from_env`], reading variables through `lookup`.
    /// Unset or unrecognised values leave the default in place.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(flag) = lookup(MEMOIZE_BASES_ENV).and_then(|v| parse_flag(&v)) {
            config.memoize_bases = flag;
        }
        if let Some(flag) = lookup(TRACE_ARGUMENTS_ENV).and_then(|v| parse_flag(&v)) {
            config.trace_arguments = flag;
        }
        config
    }

    pub fn memoize_bases(mut self, enabled: bool) -> Self {
        self.memoize_bases = enabled;
        self
    }

    pub fn trace_arguments(mut self, enabled: bool) -> Self {
        self.trace_arguments = enabled;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = EvalConfig::from_json(r#"{"memoize_bases": true}"#).expect("parse");
        assert!(config.memoize_bases);
        assert!(!config.trace_arguments);
        assert_eq!(EvalConfig::from_json("{}").expect("parse"), EvalConfig::default());
        assert!(EvalConfig::from_json(r#"{"memoize_bases": "sometimes"}"#).is_err());
    }

    #[test]
    fn lookup_parses_flags() {
        let config = EvalConfig::from_lookup(|name| match name {
            MEMOIZE_BASES_ENV => Some("Yes".to_string()),
            TRACE_ARGUMENTS_ENV => Some("maybe".to_string()),
            _ => None,
        });
        assert!(config.memoize_bases);
        assert!(!config.trace_arguments);
    }
}
