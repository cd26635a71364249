//! Stance classification: paragraph vectors plus logistic regression
//!
//! Reads labeled responses, trains PV-DBOW on every labeled text, infers a
//! vector for each one, then holds out a stratified test split and reports
//! how well a softmax classifier recovers the labels.

pub mod doc2vec;
pub mod logistic;
pub mod report;
pub mod split;
pub mod tokenize;

pub use doc2vec::{Doc2Vec, Doc2VecParams};
pub use logistic::LogisticRegression;
pub use report::{classification_report, ClassMetrics, ClassificationReport};
pub use split::{train_test_split_stratified, Split};
pub use tokenize::tokenize;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::StanceConfig;
use crate::error::PipelineResult;
use crate::table::{Table, TableError};

pub const TEXT_COLUMN: &str = "ResponseText";
pub const LABEL_COLUMN: &str = "StanceLabel";

#[derive(Debug, thiserror::Error)]
pub enum StanceError {
    #[error("Stance training needs at least 2 distinct labels, found {0}")]
    TooFewClasses(usize),

    #[error("No token appears at least {min_count} times")]
    EmptyVocabulary { min_count: usize },

    #[error("Held-out split is empty; add more labeled rows")]
    EmptyTestSet,

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Result of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StanceOutcome {
    pub text_column: String,
    pub label_column: String,
    pub rows: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub vocabulary: usize,
    pub classes: Vec<String>,
    pub report: ClassificationReport,
}

/// Train and evaluate the stance classifier on `table`.
///
/// Rows with an empty label are ignored; a missing text is treated as an
/// empty document.
pub fn train_stance_classifier(
    table: &Table,
    text_col: &str,
    label_col: &str,
    config: &StanceConfig,
) -> Result<StanceOutcome, StanceError> {
    if !(0.0..1.0).contains(&config.test_size) {
        return Err(StanceError::InvalidParams(format!(
            "test_size must be in [0, 1), got {}",
            config.test_size
        )));
    }

    let texts = table.column(text_col)?;
    let labels = table.column(label_col)?;

    let (docs, y): (Vec<Vec<String>>, Vec<String>) = texts
        .iter()
        .zip(&labels)
        .filter(|(_, label)| !label.trim().is_empty())
        .map(|(text, label)| (tokenize(text), label.trim().to_string()))
        .unzip();

    let mut distinct = y.clone();
    distinct.sort();
    distinct.dedup();
    if distinct.len() < 2 {
        return Err(StanceError::TooFewClasses(distinct.len()));
    }
    tracing::info!("Stance: {} labeled rows, classes {:?}", y.len(), distinct);

    // Embeddings come from the whole corpus, every row inferred the same way
    let mut model = Doc2Vec::train(&docs, Doc2VecParams::from(config))?;
    let embeddings: Vec<Vec<f64>> = docs.iter().map(|d| model.infer_vector(d)).collect();

    let split = train_test_split_stratified(&y, config.test_size, config.seed);
    if split.test.is_empty() {
        return Err(StanceError::EmptyTestSet);
    }

    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<String>) {
        idx.iter().map(|&i| (embeddings[i].clone(), y[i].clone())).unzip()
    };
    let (x_train, y_train) = pick(&split.train);
    let (x_test, y_test) = pick(&split.test);

    let mut clf = LogisticRegression::new(config.max_iter);
    clf.fit(&x_train, &y_train)?;
    let predicted = clf.predict(&x_test);
    let report = classification_report(&y_test, &predicted);

    tracing::info!(
        "Stance: trained on {}, evaluated on {}, accuracy {:.3}",
        split.train.len(),
        split.test.len(),
        report.accuracy
    );

    Ok(StanceOutcome {
        text_column: text_col.to_string(),
        label_column: label_col.to_string(),
        rows: y.len(),
        train_size: split.train.len(),
        test_size: split.test.len(),
        vocabulary: model.vocab_len(),
        classes: clf.classes().to_vec(),
        report,
    })
}

/// Load `input`, train, print the report and optionally save it as JSON
pub fn run_stance(
    input: &Path,
    text_col: &str,
    label_col: &str,
    config: &StanceConfig,
    report_path: Option<&Path>,
) -> PipelineResult<StanceOutcome> {
    let table = Table::read_csv(input)?;
    let outcome = train_stance_classifier(&table, text_col, label_col, config)?;

    println!("{}", outcome.report);

    if let Some(path) = report_path {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)?;
        tracing::info!("Saved stance report to {}", path.display());
    }
    Ok(outcome)
}
