// Gibberish Guard Core Services
// Validation logic and its collaborator seams:
// - classifier: trait + HTTP client for the pretrained gibberish model
// - splitter: trait + deterministic rule-based sentence tokenizer
// - gibberish: the filter itself (threshold decision, outcome construction)
// - registry: name -> constructor mapping exposed to the host framework
// - config_store: persistent validator configuration
// - setup: one-time tokenizer-data install and classifier warm-up

pub mod classifier;
pub mod config_store;
pub mod gibberish;
pub mod registry;
pub mod setup;
pub mod splitter;

pub use classifier::{Classifier, ClassifierError, HttpClassifier, GIBBERISH_MODEL};
pub use config_store::{ConfigStore, GuardConfig, ValidationConfig};
pub use gibberish::{apply_on_fail, FilterOptions, GibberishFilter, ValidatorError, CLEAN_LABEL};
pub use registry::{Validator, ValidatorRegistry, GIBBERISH_VALIDATOR_NAME, STRING_DATA_TYPE};
pub use splitter::{RuleSentenceSplitter, SentenceSplitter};
