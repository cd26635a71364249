//! Results reporting

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisReport, BoxStats, FriedmanResult};

/// JSON summary written next to each analyzer's plot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummary {
    pub run_id: String,
    pub timestamp: String,
    pub analyzer: String,
    pub columns: Vec<String>,
    pub rows_total: usize,
    pub rows_used: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friedman: Option<FriedmanResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friedman_note: Option<String>,
    pub groups: Vec<BoxStats>,
}

impl JsonSummary {
    /// Create from an analyzer report
    pub fn from_report(run_id: impl Into<String>, report: &AnalysisReport) -> Self {
        Self {
            run_id: run_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            analyzer: report.analyzer.clone(),
            columns: report.columns.clone(),
            rows_total: report.rows_total,
            rows_used: report.rows_used,
            friedman: report.friedman,
            friedman_note: report.friedman_note.clone(),
            groups: report.groups.clone(),
        }
    }

    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// `results/plots/reading_level.svg` -> `results/plots/reading_level.json`
pub fn summary_path(plot_path: &Path) -> PathBuf {
    plot_path.with_extension("json")
}

/// Run identifier from the current UTC time
pub fn new_run_id() -> String {
    chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Generate a console report
pub fn print_console_report(report: &AnalysisReport) {
    println!("\n=== {} analysis ===\n", report.analyzer);
    println!("Columns: {}", report.columns.len());
    for col in &report.columns {
        println!("  - {}", col);
    }
    println!(
        "Rows: {} total, {} complete across all columns",
        report.rows_total, report.rows_used
    );

    match (&report.friedman, &report.friedman_note) {
        (Some(f), _) => println!(
            "Friedman statistic: {:.4}, p-value: {:.4e} (k={}, n={})",
            f.statistic, f.p_value, f.groups, f.blocks
        ),
        (None, Some(note)) => println!("Friedman test {}", note),
        (None, None) => {}
    }

    println!("\nGroup means:");
    println!("{:-<50}", "");
    let mut ranked: Vec<_> = report.groups.iter().collect();
    ranked.sort_by(|a, b| b.mean.partial_cmp(&a.mean).unwrap_or(std::cmp::Ordering::Equal));
    for (i, g) in ranked.iter().enumerate() {
        println!("  {}. {} - mean {:.3} (n={})", i + 1, g.label, g.mean, g.count);
    }

    println!("\n{:=<50}", "");
}
