// Gibberish Filter
// Decides per text unit whether it is gibberish and aggregates the unit
// verdicts into one pass/fail outcome.

use crate::models::{Granularity, Metadata, OnFailAction, ValidationOutcome};
use crate::services::classifier::{Classifier, ClassifierError};
use crate::services::splitter::SentenceSplitter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Label the model emits for meaningful text; every other label counts as
/// gibberish regardless of score.
pub const CLEAN_LABEL: &str = "clean";

const FULL_TEXT_FAIL_MESSAGE: &str = "The generated text was found to be gibberish.";

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("invalid validator configuration: {0}")]
    Configuration(String),
    #[error("classification failed: {0}")]
    Classifier(#[from] ClassifierError),
    /// Produced only when the caller turns a negative verdict into an
    /// error via `OnFailAction::Exception`.
    #[error("validation failed: {0}")]
    Rejected(String),
}

// ============ Filter Options ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Minimum (exclusive) confidence for a "clean" label to be accepted.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// `"sentence"` or `"full"`.
    #[serde(default = "default_validation_method")]
    pub validation_method: String,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            validation_method: "sentence".to_string(),
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}
fn default_validation_method() -> String {
    "sentence".to_string()
}

// ============ Gibberish Filter ============

/// Validates that generated text is not gibberish.
///
/// The classifier and sentence splitter are injected at construction and
/// reused, read-only, across every `validate` call. In sentence mode the
/// filter removes the sentences predicted to be gibberish and offers the
/// remainder as a fixed value; in full mode the whole text stands or falls
/// as one unit.
pub struct GibberishFilter {
    threshold: f64,
    granularity: Granularity,
    classifier: Arc<dyn Classifier>,
    splitter: Arc<dyn SentenceSplitter>,
}

impl GibberishFilter {
    /// Build a filter, rejecting unrecognized validation methods outright.
    pub fn new(
        options: FilterOptions,
        classifier: Arc<dyn Classifier>,
        splitter: Arc<dyn SentenceSplitter>,
    ) -> Result<Self, ValidatorError> {
        let granularity = Granularity::parse(&options.validation_method).ok_or_else(|| {
            ValidatorError::Configuration(format!(
                "validation_method must be 'sentence' or 'full', got '{}'",
                options.validation_method
            ))
        })?;

        Ok(Self {
            threshold: options.threshold,
            granularity,
            classifier,
            splitter,
        })
    }

    pub fn with_defaults(
        classifier: Arc<dyn Classifier>,
        splitter: Arc<dyn SentenceSplitter>,
    ) -> Self {
        Self {
            threshold: 0.5,
            granularity: Granularity::Sentence,
            classifier,
            splitter,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decide whether one text unit is gibberish.
    ///
    /// Clean requires the "clean" label with confidence strictly above the
    /// threshold; a score exactly at the threshold is still gibberish.
    pub async fn is_gibberish(&self, value: &str) -> Result<bool, ValidatorError> {
        let prediction = self.classifier.classify(value).await?;
        let clean = prediction.label == CLEAN_LABEL && prediction.score > self.threshold;
        debug!(
            label = %prediction.label,
            score = prediction.score,
            threshold = self.threshold,
            gibberish = !clean,
            "filter.unit_verdict"
        );
        Ok(!clean)
    }

    /// Validate each sentence independently and strip the gibberish ones.
    async fn validate_each_sentence(
        &self,
        value: &str,
        metadata: Metadata,
    ) -> Result<ValidationOutcome, ValidatorError> {
        let sentences = self.splitter.split(value);

        let mut unsupported_sentences: Vec<String> = Vec::new();
        let mut supported_sentences: Vec<String> = Vec::new();
        for sentence in sentences {
            if self.is_gibberish(&sentence).await? {
                unsupported_sentences.push(sentence);
            } else {
                supported_sentences.push(sentence);
            }
        }

        if !unsupported_sentences.is_empty() {
            let listing = format!("- {}", unsupported_sentences.join("\n- "));
            return Ok(ValidationOutcome::Fail {
                error_message: format!(
                    "The following sentences in your response were found to be gibberish:\n\n{}",
                    listing
                ),
                fix_value: Some(supported_sentences.join("\n")),
                metadata,
            });
        }
        Ok(ValidationOutcome::Pass)
    }

    /// Validate the entire text as one unit; no partial recovery.
    async fn validate_full_text(
        &self,
        value: &str,
        metadata: Metadata,
    ) -> Result<ValidationOutcome, ValidatorError> {
        if self.is_gibberish(value).await? {
            return Ok(ValidationOutcome::Fail {
                error_message: FULL_TEXT_FAIL_MESSAGE.to_string(),
                fix_value: None,
                metadata,
            });
        }
        Ok(ValidationOutcome::Pass)
    }

    /// Validation entry point consumed by the host parse/validate pipeline.
    pub async fn validate(
        &self,
        value: &str,
        metadata: Metadata,
    ) -> Result<ValidationOutcome, ValidatorError> {
        let request_id = Uuid::new_v4();
        let outcome = match self.granularity {
            Granularity::Sentence => self.validate_each_sentence(value, metadata).await?,
            Granularity::Full => self.validate_full_text(value, metadata).await?,
        };

        info!(
            request_id = %request_id,
            granularity = self.granularity.as_str(),
            chars = value.chars().count(),
            passed = outcome.is_pass(),
            "filter.validated"
        );
        Ok(outcome)
    }
}

/// Apply the caller-selected failure strategy to an outcome.
///
/// `Filter` substitutes the cleaned value when one exists (full mode has
/// none, so the original value survives); `Exception` converts the verdict
/// into an error; `Noop` always keeps the original.
pub fn apply_on_fail(
    value: &str,
    outcome: &ValidationOutcome,
    action: OnFailAction,
) -> Result<String, ValidatorError> {
    match outcome {
        ValidationOutcome::Pass => Ok(value.to_string()),
        ValidationOutcome::Fail {
            error_message,
            fix_value,
            ..
        } => match action {
            OnFailAction::Exception => Err(ValidatorError::Rejected(error_message.clone())),
            OnFailAction::Filter => Ok(fix_value.clone().unwrap_or_else(|| value.to_string())),
            OnFailAction::Noop => Ok(value.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassificationResult;
    use crate::services::splitter::RuleSentenceSplitter;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Scripted classifier: exact-match rules, everything else clean at 0.95.
    struct ScriptedClassifier {
        rules: HashMap<String, (String, f64)>,
    }

    impl ScriptedClassifier {
        fn new(rules: &[(&str, &str, f64)]) -> Self {
            Self {
                rules: rules
                    .iter()
                    .map(|(text, label, score)| {
                        (text.to_string(), (label.to_string(), *score))
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifierError> {
            let (label, score) = self
                .rules
                .get(text)
                .cloned()
                .unwrap_or_else(|| (CLEAN_LABEL.to_string(), 0.95));
            Ok(ClassificationResult { label, score })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Always fails, like a model that returns no prediction.
    struct BrokenClassifier;

    #[async_trait]
    impl Classifier for BrokenClassifier {
        async fn classify(&self, _text: &str) -> Result<ClassificationResult, ClassifierError> {
            Err(ClassifierError::EmptyPrediction)
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn sentence_filter(classifier: ScriptedClassifier) -> GibberishFilter {
        GibberishFilter::new(
            FilterOptions::default(),
            Arc::new(classifier),
            Arc::new(RuleSentenceSplitter::new()),
        )
        .unwrap()
    }

    fn full_filter(classifier: ScriptedClassifier) -> GibberishFilter {
        GibberishFilter::new(
            FilterOptions {
                threshold: 0.5,
                validation_method: "full".to_string(),
            },
            Arc::new(classifier),
            Arc::new(RuleSentenceSplitter::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_validation_method_is_rejected() {
        let result = GibberishFilter::new(
            FilterOptions {
                threshold: 0.5,
                validation_method: "paragraph".to_string(),
            },
            Arc::new(ScriptedClassifier::new(&[])),
            Arc::new(RuleSentenceSplitter::new()),
        );
        assert!(matches!(result, Err(ValidatorError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_score_at_threshold_is_gibberish() {
        let filter = sentence_filter(ScriptedClassifier::new(&[("Edge case.", CLEAN_LABEL, 0.5)]));
        assert!(filter.is_gibberish("Edge case.").await.unwrap());
    }

    #[tokio::test]
    async fn test_score_above_threshold_is_clean() {
        let filter = sentence_filter(ScriptedClassifier::new(&[("Fine text.", CLEAN_LABEL, 0.51)]));
        assert!(!filter.is_gibberish("Fine text.").await.unwrap());
    }

    #[tokio::test]
    async fn test_non_clean_label_is_gibberish_regardless_of_score() {
        let filter = sentence_filter(ScriptedClassifier::new(&[("Blah.", "word salad", 0.99)]));
        assert!(filter.is_gibberish("Blah.").await.unwrap());
    }

    #[tokio::test]
    async fn test_sentence_mode_all_clean_passes() {
        let filter = sentence_filter(ScriptedClassifier::new(&[]));
        let outcome = filter
            .validate(
                "Apple's MacBook Pro is a great laptop. It has a great keyboard.",
                Metadata::new(),
            )
            .await
            .unwrap();
        assert!(outcome.is_pass());
    }

    #[tokio::test]
    async fn test_sentence_mode_strips_gibberish_sentence() {
        let filter = sentence_filter(ScriptedClassifier::new(&[(
            "Fox fox fox fox fox.",
            "noise",
            0.92,
        )]));
        let outcome = filter
            .validate(
                "The quick brown fox jumps over the lazy dog. Fox fox fox fox fox.",
                Metadata::new(),
            )
            .await
            .unwrap();

        match outcome {
            ValidationOutcome::Fail {
                error_message,
                fix_value,
                ..
            } => {
                assert!(error_message
                    .contains("The following sentences in your response were found to be gibberish:"));
                assert!(error_message.contains("- Fox fox fox fox fox."));
                assert_eq!(
                    fix_value.as_deref(),
                    Some("The quick brown fox jumps over the lazy dog.")
                );
            }
            ValidationOutcome::Pass => panic!("expected a failed outcome"),
        }
    }

    #[tokio::test]
    async fn test_gibberish_after_contraction_is_stripped() {
        let filter = sentence_filter(ScriptedClassifier::new(&[(
            "Fox fox fox fox fox.",
            "noise",
            0.92,
        )]));
        let outcome = filter
            .validate("It's a fine day. Fox fox fox fox fox.", Metadata::new())
            .await
            .unwrap();

        match outcome {
            ValidationOutcome::Fail {
                error_message,
                fix_value,
                ..
            } => {
                assert!(error_message.contains("- Fox fox fox fox fox."));
                assert_eq!(fix_value.as_deref(), Some("It's a fine day."));
            }
            ValidationOutcome::Pass => panic!("expected a failed outcome"),
        }
    }

    #[tokio::test]
    async fn test_sentence_mode_preserves_order() {
        let filter = sentence_filter(ScriptedClassifier::new(&[
            ("Bbb bbb.", "noise", 0.9),
            ("Ddd ddd.", "noise", 0.9),
        ]));
        let outcome = filter
            .validate("Aaa one. Bbb bbb. Ccc two. Ddd ddd. Eee three.", Metadata::new())
            .await
            .unwrap();

        match outcome {
            ValidationOutcome::Fail {
                error_message,
                fix_value,
                ..
            } => {
                assert_eq!(fix_value.as_deref(), Some("Aaa one.\nCcc two.\nEee three."));
                let b_pos = error_message.find("Bbb bbb.").unwrap();
                let d_pos = error_message.find("Ddd ddd.").unwrap();
                assert!(b_pos < d_pos);
            }
            ValidationOutcome::Pass => panic!("expected a failed outcome"),
        }
    }

    #[tokio::test]
    async fn test_sentence_mode_empty_input_passes() {
        let filter = sentence_filter(ScriptedClassifier::new(&[]));
        let outcome = filter.validate("", Metadata::new()).await.unwrap();
        assert!(outcome.is_pass());
    }

    #[tokio::test]
    async fn test_full_mode_pass_and_fail() {
        let clean = full_filter(ScriptedClassifier::new(&[]));
        assert!(clean
            .validate("Zoom is a great video conferencing tool.", Metadata::new())
            .await
            .unwrap()
            .is_pass());

        let text = "HSHAdhhghjgjhgfjhf jdhfjdhkfhkfd";
        let noisy = full_filter(ScriptedClassifier::new(&[(text, "noise", 0.97)]));
        match noisy.validate(text, Metadata::new()).await.unwrap() {
            ValidationOutcome::Fail {
                error_message,
                fix_value,
                ..
            } => {
                assert_eq!(error_message, FULL_TEXT_FAIL_MESSAGE);
                assert!(fix_value.is_none());
            }
            ValidationOutcome::Pass => panic!("expected a failed outcome"),
        }
    }

    #[tokio::test]
    async fn test_metadata_is_attached_to_failures() {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), serde_json::json!("unit-test"));

        let filter = full_filter(ScriptedClassifier::new(&[("blah", "noise", 0.9)]));
        match filter.validate("blah", metadata).await.unwrap() {
            ValidationOutcome::Fail { metadata, .. } => {
                assert_eq!(metadata.get("source"), Some(&serde_json::json!("unit-test")));
            }
            ValidationOutcome::Pass => panic!("expected a failed outcome"),
        }
    }

    #[tokio::test]
    async fn test_classifier_failure_is_not_treated_as_clean() {
        let filter = GibberishFilter::with_defaults(
            Arc::new(BrokenClassifier),
            Arc::new(RuleSentenceSplitter::new()),
        );
        let result = filter.validate("Some text.", Metadata::new()).await;
        assert!(matches!(result, Err(ValidatorError::Classifier(_))));
    }

    #[tokio::test]
    async fn test_apply_on_fail_strategies() {
        let filter = sentence_filter(ScriptedClassifier::new(&[(
            "Fox fox fox fox fox.",
            "noise",
            0.92,
        )]));
        let value = "The quick brown fox jumps over the lazy dog. Fox fox fox fox fox.";
        let outcome = filter.validate(value, Metadata::new()).await.unwrap();

        assert_eq!(
            apply_on_fail(value, &outcome, OnFailAction::Filter).unwrap(),
            "The quick brown fox jumps over the lazy dog."
        );
        assert_eq!(
            apply_on_fail(value, &outcome, OnFailAction::Noop).unwrap(),
            value
        );
        assert!(matches!(
            apply_on_fail(value, &outcome, OnFailAction::Exception),
            Err(ValidatorError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_on_fail_passthrough_on_pass() {
        let outcome = ValidationOutcome::Pass;
        assert_eq!(
            apply_on_fail("original", &outcome, OnFailAction::Exception).unwrap(),
            "original"
        );
    }
}
