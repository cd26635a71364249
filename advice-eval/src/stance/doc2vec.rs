//! Paragraph vectors (PV-DBOW) trained with negative sampling
//!
//! Each document gets a dense vector trained to predict the words it
//! contains against a handful of words drawn from the smoothed unigram
//! distribution. Unseen documents are embedded by training a fresh vector
//! against the frozen output weights.

use indexmap::IndexMap;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::StanceError;
use crate::config::StanceConfig;

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct Doc2VecParams {
    pub vector_size: usize,
    pub min_count: usize,
    pub epochs: usize,
    pub negative: usize,
    pub learning_rate: f64,
    pub min_learning_rate: f64,
    pub seed: u64,
}

impl Default for Doc2VecParams {
    fn default() -> Self {
        Self {
            vector_size: 100,
            min_count: 2,
            epochs: 20,
            negative: 5,
            learning_rate: 0.025,
            min_learning_rate: 0.0001,
            seed: 42,
        }
    }
}

impl From<&StanceConfig> for Doc2VecParams {
    fn from(config: &StanceConfig) -> Self {
        Self {
            vector_size: config.vector_size,
            min_count: config.min_count,
            epochs: config.epochs,
            seed: config.seed,
            ..Self::default()
        }
    }
}

/// A trained PV-DBOW model
#[derive(Debug, Clone)]
pub struct Doc2Vec {
    params: Doc2VecParams,
    vocab: IndexMap<String, usize>,
    output: Vec<Vec<f64>>,
    doc_vectors: Vec<Vec<f64>>,
    noise: WeightedIndex<f64>,
}

fn sigmoid(x: f64) -> f64 {
    if x > 6.0 {
        1.0
    } else if x < -6.0 {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn random_vector(rng: &mut StdRng, size: usize) -> Vec<f64> {
    (0..size)
        .map(|_| (rng.gen::<f64>() - 0.5) / size as f64)
        .collect()
}

impl Doc2Vec {
    /// Build the vocabulary and train one vector per document
    pub fn train(docs: &[Vec<String>], params: Doc2VecParams) -> Result<Self, StanceError> {
        if params.vector_size == 0 {
            return Err(StanceError::InvalidParams("vector_size must be positive".into()));
        }

        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for doc in docs {
            for token in doc {
                *counts.entry(token.as_str()).or_default() += 1;
            }
        }
        let mut kept: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(_, c)| *c >= params.min_count)
            .collect();
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if kept.is_empty() {
            return Err(StanceError::EmptyVocabulary { min_count: params.min_count });
        }

        let vocab: IndexMap<String, usize> = kept
            .iter()
            .enumerate()
            .map(|(i, (w, _))| (w.to_string(), i))
            .collect();
        let noise = WeightedIndex::new(kept.iter().map(|(_, c)| (*c as f64).powf(0.75)))
            .map_err(|e| StanceError::InvalidParams(e.to_string()))?;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let doc_vectors = (0..docs.len())
            .map(|_| random_vector(&mut rng, params.vector_size))
            .collect();
        let output = vec![vec![0.0; params.vector_size]; vocab.len()];

        let mut model = Self {
            params,
            vocab,
            output,
            doc_vectors,
            noise,
        };

        let encoded: Vec<Vec<usize>> = docs.iter().map(|d| model.encode(d)).collect();
        let total = (model.params.epochs * encoded.len()).max(1);
        let mut step = 0;

        for _ in 0..model.params.epochs {
            for (d, words) in encoded.iter().enumerate() {
                let lr = model.learning_rate_at(step, total);
                step += 1;
                let mut vector = std::mem::take(&mut model.doc_vectors[d]);
                for &word in words {
                    model.train_pair(&mut vector, word, lr, &mut rng, true);
                }
                model.doc_vectors[d] = vector;
            }
        }

        tracing::debug!(
            "doc2vec: {} documents, vocabulary {}, {} epochs",
            model.doc_vectors.len(),
            model.vocab.len(),
            model.params.epochs
        );
        Ok(model)
    }

    fn encode(&self, tokens: &[String]) -> Vec<usize> {
        tokens.iter().filter_map(|t| self.vocab.get(t).copied()).collect()
    }

    fn learning_rate_at(&self, step: usize, total: usize) -> f64 {
        let p = &self.params;
        let progress = step as f64 / total as f64;
        (p.learning_rate - (p.learning_rate - p.min_learning_rate) * progress).max(p.min_learning_rate)
    }

    /// One positive example plus `negative` noise words
    fn train_pair(&mut self, vector: &mut [f64], word: usize, lr: f64, rng: &mut StdRng, update_output: bool) {
        let mut grad = vec![0.0; vector.len()];

        for n in 0..=self.params.negative {
            let (target, label) = if n == 0 {
                (word, 1.0)
            } else {
                let sample = self.noise.sample(rng);
                if sample == word {
                    continue;
                }
                (sample, 0.0)
            };

            let out = &mut self.output[target];
            let g = (label - sigmoid(dot(vector, out))) * lr;
            for (acc, o) in grad.iter_mut().zip(out.iter()) {
                *acc += g * o;
            }
            if update_output {
                for (o, v) in out.iter_mut().zip(vector.iter()) {
                    *o += g * v;
                }
            }
        }

        for (v, g) in vector.iter_mut().zip(&grad) {
            *v += g;
        }
    }

    /// Embed an unseen document with the output weights frozen
    pub fn infer_vector(&mut self, tokens: &[String]) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut vector = random_vector(&mut rng, self.params.vector_size);
        let words = self.encode(tokens);
        if words.is_empty() {
            return vector;
        }

        let total = self.params.epochs.max(1);
        for epoch in 0..self.params.epochs {
            let lr = self.learning_rate_at(epoch, total);
            for &word in &words {
                self.train_pair(&mut vector, word, lr, &mut rng, false);
            }
        }
        vector
    }

    /// Trained vector of the `i`th training document
    pub fn document_vector(&self, i: usize) -> Option<&[f64]> {
        self.doc_vectors.get(i).map(Vec::as_slice)
    }

    pub fn vocab_len(&self) -> usize {
        self.vocab.len()
    }

    pub fn vector_size(&self) -> usize {
        self.params.vector_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stance::tokenize;

    fn corpus() -> Vec<Vec<String>> {
        [
            "rest and drink water",
            "rest and drink fluids",
            "see a doctor right away",
            "see a doctor today",
        ]
        .iter()
        .map(|t| tokenize(t))
        .collect()
    }

    fn small_params() -> Doc2VecParams {
        Doc2VecParams {
            vector_size: 8,
            epochs: 5,
            ..Doc2VecParams::default()
        }
    }

    #[test]
    fn test_vocabulary_respects_min_count() {
        let model = Doc2Vec::train(&corpus(), small_params()).unwrap();
        // rest, and, drink, see, a, doctor
        assert_eq!(model.vocab_len(), 6);
        assert_eq!(model.document_vector(0).unwrap().len(), 8);
    }

    #[test]
    fn test_empty_vocabulary_is_an_error() {
        let docs = vec![tokenize("one"), tokenize("two")];
        let err = Doc2Vec::train(&docs, small_params()).unwrap_err();
        assert!(matches!(err, StanceError::EmptyVocabulary { .. }));
    }

    #[test]
    fn test_inference_is_deterministic() {
        let mut a = Doc2Vec::train(&corpus(), small_params()).unwrap();
        let mut b = Doc2Vec::train(&corpus(), small_params()).unwrap();
        let doc = tokenize("drink water and rest");
        assert_eq!(a.infer_vector(&doc), b.infer_vector(&doc));
    }

    #[test]
    fn test_out_of_vocabulary_document_gets_initial_vector() {
        let mut model = Doc2Vec::train(&corpus(), small_params()).unwrap();
        let v1 = model.infer_vector(&tokenize("zebra"));
        let v2 = model.infer_vector(&tokenize("quartz"));
        assert_eq!(v1, v2);
    }
}
