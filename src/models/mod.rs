// Gibberish Guard Data Models
// Shared types exchanged between the filter, the classifier client and callers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque caller metadata, attached unchanged to any `Fail` outcome.
pub type Metadata = HashMap<String, serde_json::Value>;

// ============ Validation Granularity ============

/// Whether classification is applied per sentence or to the whole input.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Sentence,
    Full,
}

impl Granularity {
    /// Parse a configuration string. Unrecognized values are rejected so
    /// the filter can refuse construction instead of guessing a default.
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_lowercase().as_str() {
            "sentence" => Some(Self::Sentence),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentence => "sentence",
            Self::Full => "full",
        }
    }
}

// ============ Classification ============

/// One label/score pair from the classification model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Model confidence in [0, 1].
    pub score: f64,
}

// ============ Validation Outcome ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ValidationOutcome {
    Pass,
    #[serde(rename_all = "camelCase")]
    Fail {
        error_message: String,
        /// Best-effort cleaned value (sentence mode only).
        #[serde(skip_serializing_if = "Option::is_none")]
        fix_value: Option<String>,
        #[serde(default)]
        metadata: Metadata,
    },
}

impl ValidationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn fix_value(&self) -> Option<&str> {
        match self {
            Self::Fail { fix_value, .. } => fix_value.as_deref(),
            Self::Pass => None,
        }
    }
}

// ============ On-Fail Strategy ============

/// What the caller does with a `Fail` outcome. Replaces the arbitrary
/// callable hook some frameworks use with an explicit, typed choice.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailAction {
    /// Surface the failure as an error to the caller.
    Exception,
    /// Substitute the cleaned value when one is available.
    Filter,
    /// Keep the original value and only report.
    Noop,
}

impl OnFailAction {
    pub fn parse(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "exception" => Self::Exception,
            "filter" => Self::Filter,
            _ => Self::Noop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_parse() {
        assert_eq!(Granularity::parse("sentence"), Some(Granularity::Sentence));
        assert_eq!(Granularity::parse(" FULL "), Some(Granularity::Full));
        assert_eq!(Granularity::parse("paragraph"), None);
        assert_eq!(Granularity::parse(""), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ValidationOutcome::Fail {
            error_message: "bad".to_string(),
            fix_value: Some("good".to_string()),
            metadata: Metadata::new(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"fail\""));
        assert!(json.contains("fixValue"));

        let parsed: ValidationOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.fix_value(), Some("good"));
    }

    #[test]
    fn test_pass_has_no_fix_value() {
        let outcome = ValidationOutcome::Pass;
        assert!(outcome.is_pass());
        assert!(outcome.fix_value().is_none());
    }

    #[test]
    fn test_on_fail_parse_defaults_to_noop() {
        assert_eq!(OnFailAction::parse("exception"), OnFailAction::Exception);
        assert_eq!(OnFailAction::parse("Filter"), OnFailAction::Filter);
        assert_eq!(OnFailAction::parse("whatever"), OnFailAction::Noop);
    }
}
