// Text Classification Service
// Client for the hosted gibberish-detection model plus the trait seam
// the filter consumes.

use crate::models::ClassificationResult;
use crate::services::config_store::{ClassifierConfig, ProxyConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Pretrained multi-class gibberish detector the validator is bound to.
pub const GIBBERISH_MODEL: &str = "madhurjindal/autonlp-Gibberish-Detector-492513457";

const INFERENCE_DEFAULT_URL: &str = "https://api-inference.huggingface.co/models";

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Inference API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Model returned no prediction")]
    EmptyPrediction,
    #[error("JSON parse error: {0}")]
    JsonError(String),
}

/// A model that maps one text unit to a label and a confidence score.
///
/// The label vocabulary must include `"clean"`; everything else is treated
/// as a gibberish label by the filter. Implementations are long-lived and
/// shared, so they must be safe to call from multiple tasks.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a single non-empty text unit, returning the top prediction.
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifierError>;

    /// Model identifier, for logs and error reports.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize)]
struct InferenceRequest {
    inputs: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// The inference API wraps predictions one level deeper for single inputs;
/// accept both shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl InferenceResponse {
    fn into_top(self) -> Option<LabelScore> {
        match self {
            Self::Nested(mut outer) => {
                if outer.is_empty() {
                    return None;
                }
                outer.remove(0).into_iter().next()
            }
            Self::Flat(inner) => inner.into_iter().next(),
        }
    }
}

/// Remote classifier bound to a fixed named model on a hosted
/// text-classification inference endpoint.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
}

/// Endpoint base URL: the `GIBBERISH_GUARD_INFERENCE_URL` env var wins,
/// then the persisted config override, then the hosted default.
fn resolve_base_url(config_url: Option<&str>) -> String {
    env::var("GIBBERISH_GUARD_INFERENCE_URL")
        .ok()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| config_url.map(|u| u.to_string()))
        .map(|u| u.trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| INFERENCE_DEFAULT_URL.to_string())
}

/// Bearer token: `HF_API_TOKEN` env var, then the persisted config key.
fn resolve_api_token(config_key: Option<&str>) -> Option<String> {
    env::var("HF_API_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            config_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
        })
}

fn resolve_proxy_url(proxy: Option<&ProxyConfig>) -> Option<String> {
    let proxy = proxy.filter(|p| p.enabled)?;
    proxy
        .https
        .as_deref()
        .or(proxy.http.as_deref())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

impl HttpClassifier {
    /// Build a client for the fixed gibberish model from env vars and
    /// built-in defaults alone.
    pub fn new() -> Result<Self, ClassifierError> {
        Self::from_config(&ClassifierConfig::default(), None)
    }

    /// Build a client honoring persisted settings: endpoint override, API
    /// key and, when enabled, the proxy. Env vars still take precedence
    /// over the config file.
    pub fn from_config(
        config: &ClassifierConfig,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self, ClassifierError> {
        let mut builder = Client::builder().timeout(std::time::Duration::from_secs(30));
        if let Some(proxy_url) = resolve_proxy_url(proxy) {
            builder = builder.proxy(reqwest::Proxy::all(&proxy_url)?);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint: resolve_base_url(config.base_url.as_deref()),
            model: GIBBERISH_MODEL.to_string(),
            api_token: resolve_api_token(config.api_key.as_deref()),
        })
    }

    fn model_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.model)
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifierError> {
        let t0 = Instant::now();
        let request = InferenceRequest {
            inputs: text.to_string(),
        };

        let mut req = self.client.post(self.model_url()).json(&request);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: InferenceResponse =
            serde_json::from_str(&body).map_err(|e| ClassifierError::JsonError(e.to_string()))?;

        let top = parsed.into_top().ok_or(ClassifierError::EmptyPrediction)?;
        debug!(
            model = %self.model,
            label = %top.label,
            score = top.score,
            latency_ms = t0.elapsed().as_millis() as i64,
            "classifier.prediction"
        );

        Ok(ClassificationResult {
            label: top.label,
            score: top.score,
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_response() {
        let body = r#"[[{"label":"clean","score":0.97},{"label":"noise","score":0.02}]]"#;
        let parsed: InferenceResponse = serde_json::from_str(body).unwrap();
        let top = parsed.into_top().unwrap();
        assert_eq!(top.label, "clean");
        assert!(top.score > 0.9);
    }

    #[test]
    fn test_parse_flat_response() {
        let body = r#"[{"label":"word salad","score":0.81}]"#;
        let parsed: InferenceResponse = serde_json::from_str(body).unwrap();
        let top = parsed.into_top().unwrap();
        assert_eq!(top.label, "word salad");
    }

    #[test]
    fn test_empty_response_yields_no_prediction() {
        let parsed: InferenceResponse = serde_json::from_str("[]").unwrap();
        assert!(parsed.into_top().is_none());
    }

    #[test]
    fn test_client_targets_fixed_model() {
        let classifier = HttpClassifier::new().unwrap();
        assert_eq!(classifier.name(), GIBBERISH_MODEL);
        assert!(classifier.model_url().ends_with(GIBBERISH_MODEL));
    }

    #[test]
    fn test_config_endpoint_override_is_honored() {
        let config = ClassifierConfig {
            base_url: Some("http://localhost:9090/".to_string()),
            api_key: Some("cfg-token".to_string()),
        };
        let classifier = HttpClassifier::from_config(&config, None).unwrap();
        assert!(classifier.model_url().starts_with("http://localhost:9090/"));
        assert_eq!(classifier.api_token.as_deref(), Some("cfg-token"));
    }

    #[test]
    fn test_blank_config_api_key_is_ignored() {
        let config = ClassifierConfig {
            base_url: None,
            api_key: Some("   ".to_string()),
        };
        let classifier = HttpClassifier::from_config(&config, None).unwrap();
        assert!(classifier.api_token.is_none());
    }

    #[test]
    fn test_disabled_proxy_is_not_applied() {
        let proxy = ProxyConfig {
            enabled: false,
            http: Some("http://proxy.local:8080".to_string()),
            https: None,
        };
        assert!(resolve_proxy_url(Some(&proxy)).is_none());
    }

    #[test]
    fn test_enabled_proxy_prefers_https() {
        let proxy = ProxyConfig {
            enabled: true,
            http: Some("http://proxy.local:8080".to_string()),
            https: Some("https://proxy.local:8443".to_string()),
        };
        assert_eq!(
            resolve_proxy_url(Some(&proxy)).as_deref(),
            Some("https://proxy.local:8443")
        );

        let classifier = HttpClassifier::from_config(&ClassifierConfig::default(), Some(&proxy));
        assert!(classifier.is_ok());
    }
}
