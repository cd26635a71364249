//! Response processing: readability and sentiment columns
//!
//! For every response column `<col>` this stage appends
//! `<col> - Flesch`, `<col> - Flesch Grade`, `<col> - Sentiment Label` and
//! `<col> - Sentiment Score`. Each derived column is a pure function of its
//! source column; re-running overwrites the same headers with the same
//! values.

pub mod bert;
pub mod readability;
pub mod sentiment;

pub use bert::{BertClassifier, Weights};
pub use readability::{count_syllables, flesch_kincaid_grade, flesch_reading_ease, TextStats};
pub use sentiment::{
    classify_text, create_classifier, LexiconClassifier, RemoteClassifier, SentimentClassifier,
    SentimentError, SentimentResult,
};

use std::path::Path;

use crate::error::PipelineResult;
use crate::table::{Table, TableResult};

pub const READABILITY_PREFIX: &str = "Flesch";
pub const SENTIMENT_PREFIX: &str = "Sentiment";

/// Headers that hold model responses, in table order
pub fn detect_response_columns(table: &Table) -> Vec<String> {
    table
        .headers()
        .iter()
        .filter(|h| h.ends_with("response"))
        .cloned()
        .collect()
}

pub fn reading_ease_column(col: &str, prefix: &str) -> String {
    format!("{} - {}", col, prefix)
}

pub fn grade_level_column(col: &str, prefix: &str) -> String {
    format!("{} - {} Grade", col, prefix)
}

pub fn sentiment_label_column(col: &str, prefix: &str) -> String {
    format!("{} - {} Label", col, prefix)
}

pub fn sentiment_score_column(col: &str, prefix: &str) -> String {
    format!("{} - {} Score", col, prefix)
}

/// Add reading-ease and grade-level columns for each response column
pub fn add_readability_scores(table: &mut Table, response_columns: &[String], prefix: &str) -> TableResult<()> {
    for col in response_columns {
        let texts: Vec<String> = table.column(col)?.into_iter().map(str::to_string).collect();

        let ease: Vec<Option<f64>> = texts.iter().map(|t| flesch_reading_ease(t)).collect();
        let grade: Vec<Option<f64>> = texts.iter().map(|t| flesch_kincaid_grade(t)).collect();

        let scored = ease.iter().filter(|v| v.is_some()).count();
        tracing::info!("Readability for '{}': {}/{} rows scored", col, scored, texts.len());

        table.set_float_column(&reading_ease_column(col, prefix), &ease)?;
        table.set_float_column(&grade_level_column(col, prefix), &grade)?;
    }
    Ok(())
}

/// Add sentiment label and score columns for each response column
pub async fn add_sentiment_scores(
    table: &mut Table,
    response_columns: &[String],
    classifier: &dyn SentimentClassifier,
    prefix: &str,
) -> TableResult<()> {
    for col in response_columns {
        let texts: Vec<String> = table.column(col)?.into_iter().map(str::to_string).collect();

        let mut labels = Vec::with_capacity(texts.len());
        let mut scores = Vec::with_capacity(texts.len());

        for text in &texts {
            match classify_text(classifier, text).await {
                Some(result) => {
                    labels.push(Some(result.label));
                    scores.push(Some(result.score));
                }
                None => {
                    labels.push(None);
                    scores.push(None);
                }
            }
        }

        let scored = scores.iter().filter(|v| v.is_some()).count();
        tracing::info!(
            "Sentiment ({}) for '{}': {}/{} rows scored",
            classifier.name(),
            col,
            scored,
            texts.len()
        );

        table.set_optional_column(&sentiment_label_column(col, prefix), labels)?;
        table.set_float_column(&sentiment_score_column(col, prefix), &scores)?;
    }
    Ok(())
}

/// Run both passes over every detected response column
pub async fn process_table(table: &mut Table, classifier: &dyn SentimentClassifier) -> TableResult<Vec<String>> {
    let response_cols = detect_response_columns(table);
    tracing::info!("Response columns: {:?}", response_cols);

    add_readability_scores(table, &response_cols, READABILITY_PREFIX)?;
    add_sentiment_scores(table, &response_cols, classifier, SENTIMENT_PREFIX).await?;

    Ok(response_cols)
}

/// Read `input`, append readability and sentiment columns, write `output`
pub async fn run_process(
    classifier: &dyn SentimentClassifier,
    input: &Path,
    output: &Path,
) -> PipelineResult<Vec<String>> {
    let mut table = Table::read_csv(input)?;
    let cols = process_table(&mut table, classifier).await?;
    table.write_csv(output)?;
    tracing::info!("Saved processed data to {}", output.display());
    Ok(cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses() -> Table {
        let mut t = Table::new(["patient_query", "m1 response", "m2 response"]);
        t.push_row(["q1", "Rest and drink water. It will help.", "[Error]: HTTP error: timeout"]);
        t.push_row(["q2", "", "Severe pain is a serious warning sign."]);
        t
    }

    #[test]
    fn test_detect_response_columns() {
        let mut t = responses();
        t.set_column("m1 response - Flesch", vec!["1".into(), "2".into()]).unwrap();
        assert_eq!(detect_response_columns(&t), vec!["m1 response", "m2 response"]);
    }

    #[test]
    fn test_readability_nulls_for_empty_and_error_cells() {
        let mut t = responses();
        let cols = detect_response_columns(&t);
        add_readability_scores(&mut t, &cols, READABILITY_PREFIX).unwrap();

        assert!(!t.cell(0, "m1 response - Flesch").unwrap().is_empty());
        assert_eq!(t.cell(1, "m1 response - Flesch"), Some(""));
        assert_eq!(t.cell(0, "m2 response - Flesch Grade"), Some(""));
        assert!(!t.cell(1, "m2 response - Flesch Grade").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_table_adds_four_columns_per_response() {
        let mut t = responses();
        let clf = LexiconClassifier::new();
        process_table(&mut t, &clf).await.unwrap();

        assert_eq!(t.headers().len(), 3 + 8);
        assert_eq!(t.cell(1, "m2 response - Sentiment Label"), Some("negative"));
        assert_eq!(t.cell(0, "m2 response - Sentiment Label"), Some(""));
        assert_eq!(t.cell(0, "m2 response - Sentiment Score"), Some(""));
    }

    #[tokio::test]
    async fn test_processing_twice_is_idempotent() {
        let clf = LexiconClassifier::new();
        let mut once = responses();
        process_table(&mut once, &clf).await.unwrap();

        let mut twice = once.clone();
        process_table(&mut twice, &clf).await.unwrap();

        assert_eq!(once, twice);
    }
}
