//! Column selection by header convention and complete-case filtering

use crate::table::Table;

/// Picks metric columns (one per model) by header pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Suffix(String),
    Contains(String),
    ContainsIgnoreCase(String),
}

impl ColumnSelector {
    pub fn matches(&self, header: &str) -> bool {
        match self {
            ColumnSelector::Suffix(s) => header.ends_with(s.as_str()),
            ColumnSelector::Contains(s) => header.contains(s.as_str()),
            ColumnSelector::ContainsIgnoreCase(s) => header.to_lowercase().contains(&s.to_lowercase()),
        }
    }

    /// Matching headers in table order
    pub fn select(&self, table: &Table) -> Vec<String> {
        table
            .headers()
            .iter()
            .filter(|h| self.matches(h))
            .cloned()
            .collect()
    }
}

impl std::fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnSelector::Suffix(s) => write!(f, "suffix '{}'", s),
            ColumnSelector::Contains(s) => write!(f, "substring '{}'", s),
            ColumnSelector::ContainsIgnoreCase(s) => write!(f, "substring '{}' (any case)", s),
        }
    }
}

/// Keep only the rows where every column has a value.
///
/// Returns the surviving values column by column.
pub fn drop_incomplete(columns: &[Vec<Option<f64>>]) -> Vec<Vec<f64>> {
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let complete: Vec<usize> = (0..rows)
        .filter(|&i| columns.iter().all(|c| c[i].is_some()))
        .collect();

    columns
        .iter()
        .map(|c| complete.iter().filter_map(|&i| c[i]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors() {
        let table = Table::new([
            "a response",
            "a response - Flesch",
            "a response - Flesch Grade",
            "a response - Sentiment Score",
            "Factuality on GPT-4",
        ]);

        assert_eq!(
            ColumnSelector::Suffix(" - Flesch".into()).select(&table),
            vec!["a response - Flesch"]
        );
        assert_eq!(
            ColumnSelector::Contains("Sentiment Score".into()).select(&table),
            vec!["a response - Sentiment Score"]
        );
        assert_eq!(
            ColumnSelector::ContainsIgnoreCase("factuality".into()).select(&table),
            vec!["Factuality on GPT-4"]
        );
    }

    #[test]
    fn test_drop_incomplete_leaves_no_gaps() {
        let cols = vec![
            vec![Some(1.0), None, Some(3.0), Some(4.0)],
            vec![Some(5.0), Some(6.0), None, Some(8.0)],
            vec![Some(9.0), Some(1.0), Some(2.0), Some(3.0)],
        ];
        let clean = drop_incomplete(&cols);
        assert_eq!(clean, vec![vec![1.0, 4.0], vec![5.0, 8.0], vec![9.0, 3.0]]);
    }
}
