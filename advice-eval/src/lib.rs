//! Healthcare-advice evaluation pipeline
//!
//! This crate collects answers from chat models to patient questions and
//! compares the models on what those answers look like.
//!
//! # Features
//!
//! - Row-by-row response collection from an OpenAI-compatible chat endpoint
//! - Flesch readability and sentiment columns for every response column
//! - Friedman tests and SVG boxplots across models
//! - A PV-DBOW plus logistic regression stance classifier
//!
//! # Example
//!
//! ```no_run
//! use advice_eval::{
//!     analysis::{analyze_table, AnalyzerSpec},
//!     config::SentimentConfig,
//!     process::{process_table, BertClassifier},
//!     table::Table,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut table = Table::read_csv("data/processed/healthcare_advice_with_responses.csv")?;
//!
//!     // Append readability and sentiment columns
//!     let classifier = BertClassifier::from_hub(&SentimentConfig::default())?;
//!     process_table(&mut table, &classifier).await?;
//!
//!     // Compare models on reading ease
//!     let (report, plot) = analyze_table(&AnalyzerSpec::reading_level(), &table)?;
//!     plot.write_svg("results/plots/reading_level.svg")?;
//!     println!("{:?}", report.friedman);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod collect;
pub mod config;
pub mod error;
pub mod process;
pub mod providers;
pub mod reporting;
pub mod stance;
pub mod table;

pub use config::Config;
pub use error::{PipelineError, PipelineResult};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analysis::{
        analyze_table, friedman_test, AnalysisReport, AnalyzerSpec, Boxplot, ColumnSelector,
        FriedmanResult,
    };
    pub use crate::collect::{run_collect, ResponseCollector};
    pub use crate::config::{Config, SentimentBackend};
    pub use crate::error::{PipelineError, PipelineResult};
    pub use crate::process::{
        process_table, BertClassifier, LexiconClassifier, SentimentClassifier,
    };
    pub use crate::providers::{
        create_provider_with_config, CompletionRequest, CompletionResponse, LLMProvider, Message,
        ProviderError, ProviderResult,
    };
    pub use crate::reporting::{print_console_report, JsonSummary};
    pub use crate::stance::{train_stance_classifier, StanceOutcome};
    pub use crate::table::Table;
}
