// Validator Registry
// Explicit name -> constructor mapping replacing decorator-style dynamic
// registration; the host looks validators up by their fixed name.

use crate::models::{Metadata, ValidationOutcome};
use crate::services::classifier::HttpClassifier;
use crate::services::config_store::{ConfigStore, GuardConfig};
use crate::services::gibberish::{FilterOptions, GibberishFilter, ValidatorError};
use crate::services::splitter::RuleSentenceSplitter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Fixed name the gibberish filter is registered under.
pub const GIBBERISH_VALIDATOR_NAME: &str = "guardrails/gibberish_text";

/// The only data type the gibberish filter supports.
pub const STRING_DATA_TYPE: &str = "string";

/// Capability exposed to the host parse/validate pipeline.
#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    fn data_type(&self) -> &'static str;

    async fn validate(
        &self,
        value: &str,
        metadata: Metadata,
    ) -> Result<ValidationOutcome, ValidatorError>;
}

#[async_trait]
impl Validator for GibberishFilter {
    fn name(&self) -> &'static str {
        GIBBERISH_VALIDATOR_NAME
    }

    fn data_type(&self) -> &'static str {
        STRING_DATA_TYPE
    }

    async fn validate(
        &self,
        value: &str,
        metadata: Metadata,
    ) -> Result<ValidationOutcome, ValidatorError> {
        GibberishFilter::validate(self, value, metadata).await
    }
}

type ValidatorConstructor = fn(FilterOptions) -> Result<Arc<dyn Validator>, ValidatorError>;

fn build_gibberish_validator(options: FilterOptions) -> Result<Arc<dyn Validator>, ValidatorError> {
    let config = ConfigStore::default_config_dir()
        .map(ConfigStore::new)
        .and_then(|store| store.load().ok())
        .unwrap_or_else(GuardConfig::default);

    // Classifier acquisition failure is fatal; there is no degraded mode.
    let classifier = Arc::new(HttpClassifier::from_config(
        &config.classifier,
        config.proxy.as_ref(),
    )?);
    let splitter = Arc::new(RuleSentenceSplitter::new());
    let filter = GibberishFilter::new(options, classifier, splitter)?;
    Ok(Arc::new(filter))
}

/// Static mapping from validator name to constructor.
pub struct ValidatorRegistry {
    constructors: HashMap<&'static str, ValidatorConstructor>,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ValidatorRegistry {
    /// Registry preloaded with every validator this crate ships.
    pub fn builtin() -> Self {
        let mut constructors: HashMap<&'static str, ValidatorConstructor> = HashMap::new();
        constructors.insert(GIBBERISH_VALIDATOR_NAME, build_gibberish_validator);
        Self { constructors }
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Construct a registered validator by name.
    pub fn build(
        &self,
        name: &str,
        options: FilterOptions,
    ) -> Result<Arc<dyn Validator>, ValidatorError> {
        let constructor = self.constructors.get(name).ok_or_else(|| {
            ValidatorError::Configuration(format!("no validator registered under '{}'", name))
        })?;
        let validator = constructor(options)?;
        info!(name = name, data_type = validator.data_type(), "registry.validator_built");
        Ok(validator)
    }
}
