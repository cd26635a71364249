//! Configuration management for the evaluation pipeline
//!
//! Loads settings from TOML files. Every field has a serde default, so a
//! partial file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub stance: StanceConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Remote chat-completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Response generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Keep the built prompt in a `full_prompt` column
    #[serde(default)]
    pub persist_prompts: bool,
}

/// Which sentiment classifier the processor uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBackend {
    /// Pretrained BERT classifier from the Hugging Face Hub, run locally
    #[default]
    Bert,
    /// Hosted text-classification endpoint
    Remote,
    /// Word-list fallback for machines without the model weights
    Lexicon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    #[serde(default)]
    pub backend: SentimentBackend,
    #[serde(default = "default_sentiment_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_sentiment_model")]
    pub model: String,
    #[serde(default = "default_sentiment_key_env")]
    pub api_key_env: String,
    /// Hub revision of `model`
    #[serde(default = "default_sentiment_revision")]
    pub revision: String,
    /// Repository to take `tokenizer.json` from when `model` ships only a vocab
    #[serde(default = "default_tokenizer_fallback")]
    pub tokenizer_fallback: String,
    /// Longer inputs are truncated to this many tokens
    #[serde(default = "default_sentiment_max_length")]
    pub max_length: usize,
}

/// Stance classifier training parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StanceConfig {
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,
    #[serde(default = "default_min_count")]
    pub min_count: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

/// Default file locations for each stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_queries")]
    pub queries: String,
    #[serde(default = "default_responses")]
    pub responses: String,
    #[serde(default = "default_scores")]
    pub scores: String,
    #[serde(default = "default_stance_labeled")]
    pub stance_labeled: String,
    #[serde(default = "default_plot_dir")]
    pub plot_dir: String,
}

// Default value functions
fn default_base_url() -> String { "https://chat.dartmouth.edu/api".to_string() }
fn default_api_key_env() -> String { "DARTMOUTH_CHAT_API_KEY".to_string() }
fn default_timeout_ms() -> u64 { 120_000 }
fn default_models() -> Vec<String> { vec!["meta-llama/Llama-3.3-70B-Instruct".to_string()] }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 750 }
fn default_sentiment_endpoint() -> String { "https://api-inference.huggingface.co/models".to_string() }
fn default_sentiment_model() -> String {
    "DrishtiSharma/BERT-Base-Uncased_for-Doctor-Patient-Sentiment".to_string()
}
fn default_sentiment_key_env() -> String { "HF_API_TOKEN".to_string() }
fn default_sentiment_revision() -> String { "main".to_string() }
fn default_tokenizer_fallback() -> String { "google-bert/bert-base-uncased".to_string() }
fn default_sentiment_max_length() -> usize { 512 }
fn default_vector_size() -> usize { 100 }
fn default_min_count() -> usize { 2 }
fn default_epochs() -> usize { 20 }
fn default_test_size() -> f64 { 0.2 }
fn default_seed() -> u64 { 42 }
fn default_max_iter() -> usize { 1000 }
fn default_queries() -> String { "data/sample_inputs/healthcare_queries_sample.csv".to_string() }
fn default_responses() -> String { "data/processed/healthcare_advice_with_responses.csv".to_string() }
fn default_scores() -> String { "data/processed/healthcare_advice_with_scores.csv".to_string() }
fn default_stance_labeled() -> String { "data/processed/stance_labeled_responses.csv".to_string() }
fn default_plot_dir() -> String { "results/plots".to_string() }

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            persist_prompts: false,
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            backend: SentimentBackend::default(),
            endpoint: default_sentiment_endpoint(),
            model: default_sentiment_model(),
            api_key_env: default_sentiment_key_env(),
            revision: default_sentiment_revision(),
            tokenizer_fallback: default_tokenizer_fallback(),
            max_length: default_sentiment_max_length(),
        }
    }
}

impl Default for StanceConfig {
    fn default() -> Self {
        Self {
            vector_size: default_vector_size(),
            min_count: default_min_count(),
            epochs: default_epochs(),
            test_size: default_test_size(),
            seed: default_seed(),
            max_iter: default_max_iter(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            queries: default_queries(),
            responses: default_responses(),
            scores: default_scores(),
            stance_labeled: default_stance_labeled(),
            plot_dir: default_plot_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = [
            "config/pipeline.toml",
            "../config/pipeline.toml",
            "advice-eval/config/pipeline.toml",
        ];

        for path in &config_paths {
            if let Ok(config) = Self::from_file(path) {
                tracing::info!("Loaded configuration from {}", path);
                return config;
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Load an explicit path if given, otherwise fall back to the search list
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                let config = Self::from_file(p)?;
                tracing::info!("Loaded configuration from {}", p.display());
                Ok(config)
            }
            None => Ok(Self::load_or_default()),
        }
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, content)
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.api_key_env, "DARTMOUTH_CHAT_API_KEY");
        assert_eq!(config.generation.max_tokens, 750);
        assert!((config.generation.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.sentiment.backend, SentimentBackend::Bert);
        assert_eq!(config.sentiment.max_length, 512);
        assert!(!config.generation.persist_prompts);
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml = r#"
[generation]
models = ["openai/gpt-4.1-mini", "anthropic/claude-3.7-sonnet"]
temperature = 0.2

[sentiment]
backend = "remote"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.generation.models.len(), 2);
        assert_eq!(config.generation.max_tokens, 750);
        assert_eq!(config.sentiment.backend, SentimentBackend::Remote);
        assert_eq!(config.stance.vector_size, 100);
        assert_eq!(config.paths.plot_dir, "results/plots");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");

        Config::default().save_toml(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.generation.models, default_models());
        assert_eq!(loaded.stance.seed, 42);
    }

    #[test]
    fn test_bundled_sample_matches_defaults() {
        let config = Config::from_toml(include_str!("../config/pipeline.toml")).unwrap();
        assert_eq!(config.service.base_url, Config::default().service.base_url);
        assert_eq!(config.stance.max_iter, 1000);
        assert_eq!(config.sentiment.backend, SentimentBackend::Bert);
        assert_eq!(config.sentiment.tokenizer_fallback, default_tokenizer_fallback());
        assert_eq!(config.paths.stance_labeled, default_stance_labeled());
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        assert!(matches!(Config::from_toml("generation = ["), Err(ConfigError::Parse(_))));
    }
}
