//! Sentiment classification of response text
//!
//! Three backends share the [`SentimentClassifier`] trait: the pretrained
//! BERT classifier run locally (see [`super::bert`]), a client for the same
//! model behind a hosted inference endpoint, and a word-list scorer kept as
//! a fallback for machines that cannot fetch model weights.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::bert::BertClassifier;
use crate::collect::is_error_marker;
use crate::config::{SentimentBackend, SentimentConfig};

/// Top label and its confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model hub error: {0}")]
    Hub(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Inference error: {0}")]
    Candle(#[from] candle_core::Error),
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentError>;
}

/// Classify `text`, or `None` when it is empty, an error marker, or the
/// classifier fails.
pub async fn classify_text(classifier: &dyn SentimentClassifier, text: &str) -> Option<SentimentResult> {
    if text.is_empty() || is_error_marker(text) {
        return None;
    }
    match classifier.classify(text).await {
        Ok(result) => Some(result),
        Err(e) => {
            tracing::warn!("{} classifier failed: {}", classifier.name(), e);
            None
        }
    }
}

/// Build the classifier selected by `backend`
pub fn create_classifier(
    config: &SentimentConfig,
    backend: SentimentBackend,
) -> Result<Box<dyn SentimentClassifier>, SentimentError> {
    match backend {
        SentimentBackend::Bert => Ok(Box::new(BertClassifier::from_hub(config)?)),
        SentimentBackend::Lexicon => Ok(Box::new(LexiconClassifier::new())),
        SentimentBackend::Remote => Ok(Box::new(RemoteClassifier::from_config(config)?)),
    }
}

// ---------------------------------------------------------------------------
// Lexicon backend
// ---------------------------------------------------------------------------

const POSITIVE: &[(&str, f64)] = &[
    ("good", 1.9), ("great", 3.1), ("helpful", 1.8), ("help", 1.2), ("helps", 1.2),
    ("safe", 1.9), ("safely", 1.6), ("effective", 2.0), ("healthy", 1.7), ("improve", 1.9),
    ("improves", 1.9), ("improvement", 1.8), ("relief", 2.1), ("relieve", 1.7), ("recover", 1.8),
    ("recovery", 1.8), ("better", 1.9), ("best", 3.2), ("benefit", 2.0), ("benefits", 2.0),
    ("beneficial", 1.9), ("support", 1.7), ("supportive", 1.8), ("comfortable", 1.9),
    ("comfort", 1.5), ("reassuring", 2.0), ("hope", 1.9), ("hopeful", 2.3), ("glad", 2.0),
    ("happy", 2.7), ("calm", 1.3), ("encourage", 2.0), ("manageable", 1.2), ("normal", 0.8),
    ("common", 0.5), ("treatable", 1.5), ("heal", 1.8), ("healing", 1.9), ("positive", 2.3),
    ("well", 1.1), ("strong", 1.6), ("gentle", 1.4), ("care", 1.6), ("caring", 2.0),
    ("understand", 1.0), ("thank", 1.5), ("welcome", 2.0), ("resolve", 1.4), ("resolves", 1.4),
];

const NEGATIVE: &[(&str, f64)] = &[
    ("bad", -2.5), ("pain", -2.3), ("painful", -2.4), ("hurt", -2.4), ("hurts", -2.4),
    ("worse", -2.1), ("worst", -3.1), ("severe", -2.1), ("serious", -1.5), ("risk", -1.1),
    ("risks", -1.1), ("risky", -1.6), ("danger", -2.4), ("dangerous", -2.6), ("harm", -2.5),
    ("harmful", -2.6), ("emergency", -1.6), ("fear", -2.2), ("afraid", -2.0), ("worry", -1.9),
    ("worried", -1.9), ("anxious", -1.7), ("anxiety", -1.8), ("stress", -1.8), ("stressful", -2.0),
    ("sick", -2.1), ("illness", -1.7), ("disease", -1.7), ("infection", -1.6), ("fatal", -3.1),
    ("death", -2.9), ("die", -2.9), ("complication", -1.5), ("complications", -1.5),
    ("symptom", -0.6), ("symptoms", -0.6), ("unsafe", -2.0), ("avoid", -0.9), ("problem", -1.7),
    ("problems", -1.7), ("difficult", -1.5), ("suffer", -2.5), ("suffering", -2.7),
    ("damage", -2.2), ("fail", -2.3), ("failure", -2.3), ("unfortunately", -1.6), ("concern", -0.8),
    ("concerning", -1.4), ("alarming", -2.0), ("toxic", -2.6),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "without", "cannot", "nor", "neither", "none"];

const BOOSTERS: &[(&str, f64)] = &[
    ("very", 0.293), ("extremely", 0.293), ("really", 0.293), ("highly", 0.293),
    ("especially", 0.293), ("particularly", 0.293), ("quite", 0.2), ("so", 0.2),
    ("slightly", -0.293), ("somewhat", -0.293), ("mildly", -0.293), ("barely", -0.293),
];

/// Flip applied to a valence preceded by a negation
const NEGATION_SCALAR: f64 = -0.74;
/// Normalization constant for the summed valence
const ALPHA: f64 = 15.0;
/// |polarity| below this is neutral
const NEUTRAL_BAND: f64 = 0.05;

/// Offline valence-lexicon classifier with negation and booster handling.
/// Not the default: select it with `--sentiment lexicon` when the BERT
/// weights cannot be downloaded.
///
/// Labels are `positive`, `negative` and `neutral`. Deterministic.
pub struct LexiconClassifier {
    lexicon: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
    token_re: Regex,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            lexicon: POSITIVE.iter().chain(NEGATIVE.iter()).copied().collect(),
            boosters: BOOSTERS.iter().copied().collect(),
            token_re: Regex::new(r"[a-z]+(?:'[a-z]+)?").expect("static regex"),
        }
    }

    fn is_negation(token: &str) -> bool {
        NEGATIONS.contains(&token) || token.ends_with("n't")
    }

    /// Normalized polarity in (-1, 1)
    pub fn polarity(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = self.token_re.find_iter(&lower).map(|m| m.as_str()).collect();

        let mut sum = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            let Some(&valence) = self.lexicon.get(token) else {
                continue;
            };
            let mut v = valence;

            if i > 0 {
                if let Some(&boost) = self.boosters.get(tokens[i - 1]) {
                    v += boost * v.signum();
                }
            }

            let window = &tokens[i.saturating_sub(3)..i];
            if window.iter().any(|t| Self::is_negation(t)) {
                v *= NEGATION_SCALAR;
            }

            sum += v;
        }

        sum / (sum * sum + ALPHA).sqrt()
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentError> {
        let polarity = self.polarity(text);
        let (label, score) = if polarity >= NEUTRAL_BAND {
            ("positive", (1.0 + polarity) / 2.0)
        } else if polarity <= -NEUTRAL_BAND {
            ("negative", (1.0 - polarity) / 2.0)
        } else {
            ("neutral", 1.0 - polarity.abs())
        };
        Ok(SentimentResult {
            label: label.to_string(),
            score,
        })
    }
}

// ---------------------------------------------------------------------------
// Remote backend
// ---------------------------------------------------------------------------

/// Client for a hosted text-classification model (Hugging Face inference shape)
pub struct RemoteClassifier {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    http_client: Client,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceParameters {
    truncation: bool,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<SentimentResult>>),
    Flat(Vec<SentimentResult>),
}

#[derive(Deserialize)]
struct InferenceError {
    error: String,
}

impl RemoteClassifier {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            http_client: Client::new(),
        }
    }

    /// Reads the bearer token from `config.api_key_env` when set
    pub fn from_config(config: &SentimentConfig) -> Result<Self, SentimentError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; calling {} without credentials",
                config.api_key_env,
                config.endpoint
            );
        }
        Ok(Self {
            api_key,
            ..Self::new(config.endpoint.trim_end_matches('/'), &config.model)
        })
    }

    fn url(&self) -> String {
        format!("{}/{}", self.endpoint, self.model)
    }
}

/// Highest-scoring entry of a classification payload
fn top_label(raw: &str) -> Result<SentimentResult, SentimentError> {
    let parsed: InferenceResponse =
        serde_json::from_str(raw).map_err(|e| SentimentError::Parse(e.to_string()))?;

    let candidates = match parsed {
        InferenceResponse::Nested(outer) => outer.into_iter().next().unwrap_or_default(),
        InferenceResponse::Flat(flat) => flat,
    };

    candidates
        .into_iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| SentimentError::Parse("empty classification result".to_string()))
}

#[async_trait]
impl SentimentClassifier for RemoteClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentError> {
        let body = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters { truncation: true },
            options: InferenceOptions { wait_for_model: true },
        };

        let mut request = self.http_client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<InferenceError>(&raw)
                .map(|e| e.error)
                .unwrap_or(raw);
            return Err(SentimentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        top_label(&raw)
    }
}
