//! Cross-model statistical analysis

pub mod analyzers;
pub mod boxplot;
pub mod friedman;
pub mod reshape;
pub mod selector;

pub use analyzers::{
    analyze_table, run_analyzer, run_factuality, run_reading_level, run_sentiment,
    AnalysisReport, AnalyzerSpec, FriedmanPolicy,
};
pub use boxplot::{BoxStats, Boxplot};
pub use friedman::{friedman_test, rank_with_ties, FriedmanResult, StatsError};
pub use reshape::{extract_model_name, melt, LongRow, LongTable};
pub use selector::{drop_incomplete, ColumnSelector};
