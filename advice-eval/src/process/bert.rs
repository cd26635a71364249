//! Pretrained BERT sequence classifier run locally with candle
//!
//! Loads a `BertForSequenceClassification` checkpoint (config, tokenizer and
//! weights) from the Hugging Face Hub or from local files. The head is the
//! usual BERT pooler (dense + tanh over `[CLS]`) followed by a linear layer;
//! the reported label is the arg-max of the softmax, named by `id2label`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Module, Tensor, D};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};

use super::sentiment::{SentimentClassifier, SentimentError, SentimentResult};
use crate::config::SentimentConfig;

/// Checkpoint weights on disk
#[derive(Debug, Clone)]
pub enum Weights {
    SafeTensors(PathBuf),
    PyTorch(PathBuf),
}

/// Fields of `config.json` the classification head needs
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

impl HeadConfig {
    /// Labels ordered by class index
    fn labels(&self) -> Result<Vec<String>, SentimentError> {
        let mut labels = vec![None; self.id2label.len()];
        for (id, label) in &self.id2label {
            let idx: usize = id
                .parse()
                .map_err(|_| SentimentError::Model(format!("bad id2label key '{}'", id)))?;
            let slot = labels
                .get_mut(idx)
                .ok_or_else(|| SentimentError::Model(format!("id2label index {} out of range", idx)))?;
            *slot = Some(label.clone());
        }
        let labels: Option<Vec<String>> = labels.into_iter().collect();
        match labels {
            Some(l) if !l.is_empty() => Ok(l),
            _ => Err(SentimentError::Model("config.json has no usable id2label".to_string())),
        }
    }
}

pub struct BertClassifier {
    name: String,
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
}

fn model_err(e: impl std::fmt::Display) -> SentimentError {
    SentimentError::Model(e.to_string())
}

fn hub_get(repo: &ApiRepo, file: &str) -> Result<PathBuf, SentimentError> {
    repo.get(file)
        .map_err(|e| SentimentError::Hub(format!("{}: {}", file, e)))
}

impl BertClassifier {
    /// Download (or reuse the cached) checkpoint named by `config.model`
    pub fn from_hub(config: &SentimentConfig) -> Result<Self, SentimentError> {
        let token = std::env::var(&config.api_key_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        let api = ApiBuilder::new()
            .with_progress(true)
            .with_token(token)
            .build()
            .map_err(|e| SentimentError::Hub(format!("failed building hf-hub client: {}", e)))?;

        let repo = api.repo(Repo::with_revision(
            config.model.clone(),
            RepoType::Model,
            config.revision.clone(),
        ));

        let config_path = hub_get(&repo, "config.json")?;
        let tokenizer_path = match repo.get("tokenizer.json") {
            Ok(path) => path,
            Err(e) => {
                tracing::info!(
                    "{} has no tokenizer.json ({}); using {}",
                    config.model,
                    e,
                    config.tokenizer_fallback
                );
                hub_get(&api.model(config.tokenizer_fallback.clone()), "tokenizer.json")?
            }
        };
        let weights = match repo.get("model.safetensors") {
            Ok(path) => Weights::SafeTensors(path),
            Err(_) => Weights::PyTorch(hub_get(&repo, "pytorch_model.bin")?),
        };

        Self::from_files(&config.model, &config_path, &tokenizer_path, &weights, config.max_length)
    }

    /// Load from a local `config.json`, `tokenizer.json` and weight file
    pub fn from_files(
        name: &str,
        config_path: &Path,
        tokenizer_path: &Path,
        weights: &Weights,
        max_length: usize,
    ) -> Result<Self, SentimentError> {
        let raw = std::fs::read_to_string(config_path).map_err(model_err)?;
        let bert_config: BertConfig = serde_json::from_str(&raw).map_err(model_err)?;
        let head: HeadConfig = serde_json::from_str(&raw).map_err(model_err)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(model_err)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(model_err)?;
        tokenizer.with_padding(None);

        let device = Device::Cpu;
        let vb = match weights {
            // Safety: the file is not modified while mapped
            Weights::SafeTensors(path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[path], DTYPE, &device)?
            },
            Weights::PyTorch(path) => VarBuilder::from_pth(path, DTYPE, &device)?,
        };

        Self::from_parts(name, &bert_config, &head, tokenizer, vb, device)
    }

    fn from_parts(
        name: &str,
        bert_config: &BertConfig,
        head: &HeadConfig,
        tokenizer: Tokenizer,
        vb: VarBuilder,
        device: Device,
    ) -> Result<Self, SentimentError> {
        let labels = head.labels()?;
        let model = BertModel::load(vb.pp("bert"), bert_config)?;
        let pooler = candle_nn::linear(head.hidden_size, head.hidden_size, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(head.hidden_size, labels.len(), vb.pp("classifier"))?;

        tracing::info!("Loaded sentiment model {} with labels {:?}", name, labels);
        Ok(Self {
            name: name.to_string(),
            model,
            pooler,
            classifier,
            tokenizer,
            labels,
            device,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Class probabilities for `text`, ordered like `labels()`
    pub fn probabilities(&self, text: &str) -> Result<Vec<f32>, SentimentError> {
        let encoding = self.tokenizer.encode(text, true).map_err(model_err)?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self.model.forward(&input_ids, &type_ids, Some(&mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;

        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?;
        Ok(probs)
    }
}

#[async_trait]
impl SentimentClassifier for BertClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentError> {
        let probs = self.probabilities(text)?;
        let (idx, score) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or_else(|| SentimentError::Model("model returned no logits".to_string()))?;

        Ok(SentimentResult {
            label: self.labels[idx].clone(),
            score: f64::from(*score),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    const CONFIG_JSON: &str = r#"{
        "model_type": "bert",
        "vocab_size": 12,
        "hidden_size": 8,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": 16,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "max_position_embeddings": 16,
        "type_vocab_size": 2,
        "initializer_range": 0.02,
        "layer_norm_eps": 1e-12,
        "pad_token_id": 0,
        "position_embedding_type": "absolute",
        "use_cache": true,
        "classifier_dropout": null,
        "id2label": {"0": "negative", "1": "neutral", "2": "positive"}
    }"#;

    const TOKENIZER_JSON: &str = r###"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": {"type": "BertNormalizer", "clean_text": true, "handle_chinese_chars": true, "strip_accents": null, "lowercase": true},
        "pre_tokenizer": {"type": "BertPreTokenizer"},
        "post_processor": {"type": "BertProcessing", "sep": ["[SEP]", 3], "cls": ["[CLS]", 2]},
        "decoder": null,
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": {"[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3, "rest": 4, "and": 5,
                      "drink": 6, "water": 7, "severe": 8, "pain": 9, "see": 10, "doctor": 11}
        }
    }"###;

    /// Writes a tiny randomly initialised checkpoint to `dir`
    fn tiny_checkpoint(dir: &Path) -> (PathBuf, PathBuf, Weights) {
        let config_path = dir.join("config.json");
        let tokenizer_path = dir.join("tokenizer.json");
        let weights_path = dir.join("model.safetensors");
        std::fs::write(&config_path, CONFIG_JSON).unwrap();
        std::fs::write(&tokenizer_path, TOKENIZER_JSON).unwrap();

        let bert_config: BertConfig = serde_json::from_str(CONFIG_JSON).unwrap();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DTYPE, &Device::Cpu);
        BertModel::load(vb.pp("bert"), &bert_config).unwrap();
        candle_nn::linear(8, 8, vb.pp("bert.pooler.dense")).unwrap();
        candle_nn::linear(8, 3, vb.pp("classifier")).unwrap();
        varmap.save(&weights_path).unwrap();

        (config_path, tokenizer_path, Weights::SafeTensors(weights_path))
    }

    #[tokio::test]
    async fn test_classifies_with_local_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (config, tokenizer, weights) = tiny_checkpoint(dir.path());
        let clf = BertClassifier::from_files("tiny-bert", &config, &tokenizer, &weights, 16).unwrap();

        assert_eq!(clf.labels(), &["negative", "neutral", "positive"]);
        let probs = clf.probabilities("Rest and drink water").unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);

        let result = clf.classify("Severe pain, see a doctor").await.unwrap();
        assert!(clf.labels().contains(&result.label));
        assert!(result.score >= 1.0 / 3.0 - 1e-6 && result.score <= 1.0);
    }

    #[tokio::test]
    async fn test_long_input_is_truncated_to_position_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (config, tokenizer, weights) = tiny_checkpoint(dir.path());
        let clf = BertClassifier::from_files("tiny-bert", &config, &tokenizer, &weights, 16).unwrap();

        let long = "rest and drink water ".repeat(40);
        assert!(clf.classify(&long).await.is_ok());
    }

    #[test]
    fn test_missing_id2label_is_rejected() {
        let head: HeadConfig = serde_json::from_str(r#"{"hidden_size": 8}"#).unwrap();
        assert!(matches!(head.labels(), Err(SentimentError::Model(_))));

        let gap: HeadConfig =
            serde_json::from_str(r#"{"hidden_size": 8, "id2label": {"0": "a", "2": "c"}}"#).unwrap();
        assert!(gap.labels().is_err());
    }
}
