//! Reading-level, sentiment and factuality analyzers
//!
//! All three share one flow: select the metric columns, parse them, drop
//! incomplete rows for the Friedman test, then draw one box per model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::boxplot::{BoxStats, Boxplot};
use super::friedman::{friedman_test, FriedmanResult, StatsError};
use super::reshape::{extract_model_name, melt};
use super::selector::{drop_incomplete, ColumnSelector};
use crate::error::{PipelineError, PipelineResult};
use crate::table::Table;

/// How the analyzer reacts when the Friedman test cannot be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriedmanPolicy {
    /// Any failure other than too few groups aborts the analysis
    Required,
    /// Failures become a note on the report
    BestEffort,
}

/// Static description of one analyzer
#[derive(Debug, Clone)]
pub struct AnalyzerSpec {
    pub name: &'static str,
    pub selector: ColumnSelector,
    pub var_name: &'static str,
    pub value_name: &'static str,
    pub title: &'static str,
    /// Pull a model name out of each header before plotting
    pub model_from_header: bool,
    pub policy: FriedmanPolicy,
}

impl AnalyzerSpec {
    pub fn reading_level() -> Self {
        Self {
            name: "reading_level",
            selector: ColumnSelector::Suffix(" - Flesch".into()),
            var_name: "Model",
            value_name: "ReadingEase",
            title: "Reading ease by model",
            model_from_header: false,
            policy: FriedmanPolicy::Required,
        }
    }

    pub fn sentiment() -> Self {
        Self {
            name: "sentiment",
            selector: ColumnSelector::Contains("Sentiment Score".into()),
            var_name: "Model",
            value_name: "SentimentScore",
            title: "Sentiment score distribution by model",
            model_from_header: false,
            policy: FriedmanPolicy::Required,
        }
    }

    pub fn factuality() -> Self {
        Self {
            name: "factuality",
            selector: ColumnSelector::ContainsIgnoreCase("factuality".into()),
            var_name: "RawModelCol",
            value_name: "Factuality",
            title: "Factuality score by model",
            model_from_header: true,
            policy: FriedmanPolicy::BestEffort,
        }
    }

    /// Default plot location under `plot_dir`
    pub fn default_plot_path(&self, plot_dir: &Path) -> PathBuf {
        plot_dir.join(format!("{}.svg", self.name))
    }
}

/// Outcome of one analyzer run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analyzer: String,
    pub columns: Vec<String>,
    pub rows_total: usize,
    pub rows_used: usize,
    pub friedman: Option<FriedmanResult>,
    pub friedman_note: Option<String>,
    pub groups: Vec<BoxStats>,
}

/// Run an analyzer over an in-memory table, returning the report and plot
pub fn analyze_table(spec: &AnalyzerSpec, table: &Table) -> PipelineResult<(AnalysisReport, Boxplot)> {
    let columns = spec.selector.select(table);
    if columns.is_empty() {
        return Err(PipelineError::NoColumns(spec.selector.to_string()));
    }
    tracing::info!("{}: selected columns {:?}", spec.name, columns);

    let parsed = table.numeric_columns(&columns)?;
    let complete = drop_incomplete(&parsed);
    let rows_used = complete.first().map(Vec::len).unwrap_or(0);
    tracing::debug!("{}: {} of {} rows complete", spec.name, rows_used, table.len());

    let (friedman, friedman_note) = match friedman_test(&complete) {
        Ok(result) => {
            tracing::info!(
                "Friedman statistic: {:.4}, p-value: {:.4e}",
                result.statistic,
                result.p_value
            );
            (Some(result), None)
        }
        Err(StatsError::TooFewGroups(k)) => {
            tracing::warn!("{}: skipping Friedman test with {} column(s)", spec.name, k);
            (None, Some(format!("skipped: Friedman test needs at least 3 columns, found {}", k)))
        }
        Err(e) if spec.policy == FriedmanPolicy::BestEffort => {
            tracing::warn!("{}: Friedman test failed: {}", spec.name, e);
            (None, Some(e.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let mut long = melt(table, &columns, spec.var_name, spec.value_name)?;
    if spec.model_from_header {
        long = long.relabel(extract_model_name);
    }
    let plot = Boxplot::from_groups(spec.title, "Model", spec.value_name, &long.groups());

    let report = AnalysisReport {
        analyzer: spec.name.to_string(),
        columns,
        rows_total: table.len(),
        rows_used,
        friedman,
        friedman_note,
        groups: plot.boxes.clone(),
    };
    Ok((report, plot))
}

/// Load `input`, analyze it and write the SVG boxplot to `plot_path`
pub fn run_analyzer(spec: &AnalyzerSpec, input: &Path, plot_path: &Path) -> PipelineResult<AnalysisReport> {
    let table = Table::read_csv(input)?;
    let (report, plot) = analyze_table(spec, &table)?;
    plot.write_svg(plot_path)?;
    tracing::info!("Saved boxplot to {}", plot_path.display());
    println!("{}", plot.to_text());
    Ok(report)
}

pub fn run_reading_level(input: &Path, plot_path: &Path) -> PipelineResult<AnalysisReport> {
    run_analyzer(&AnalyzerSpec::reading_level(), input, plot_path)
}

pub fn run_sentiment(input: &Path, plot_path: &Path) -> PipelineResult<AnalysisReport> {
    run_analyzer(&AnalyzerSpec::sentiment(), input, plot_path)
}

pub fn run_factuality(input: &Path, plot_path: &Path) -> PipelineResult<AnalysisReport> {
    run_analyzer(&AnalyzerSpec::factuality(), input, plot_path)
}
