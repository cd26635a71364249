//! Wide-to-long reshaping of metric columns

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::table::{format_float, Table, TableResult};

/// One (variable, value) observation
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub variable: String,
    pub value: Option<f64>,
}

/// Long-form table: one row per (source row, column) pair, column-major
#[derive(Debug, Clone, PartialEq)]
pub struct LongTable {
    pub var_name: String,
    pub value_name: String,
    pub rows: Vec<LongRow>,
}

/// Stack `columns` of `table` into long form
pub fn melt(table: &Table, columns: &[String], var_name: &str, value_name: &str) -> TableResult<LongTable> {
    let mut rows = Vec::with_capacity(columns.len() * table.len());
    for col in columns {
        for value in table.numeric_column(col)? {
            rows.push(LongRow {
                variable: col.clone(),
                value,
            });
        }
    }
    Ok(LongTable {
        var_name: var_name.to_string(),
        value_name: value_name.to_string(),
        rows,
    })
}

impl LongTable {
    /// Rewrite every variable label, e.g. to pull a model name out of a header
    pub fn relabel(mut self, f: impl Fn(&str) -> String) -> Self {
        for row in &mut self.rows {
            row.variable = f(&row.variable);
        }
        self
    }

    /// Present values per variable, in first-seen order
    pub fn groups(&self) -> IndexMap<String, Vec<f64>> {
        let mut groups: IndexMap<String, Vec<f64>> = IndexMap::new();
        for row in &self.rows {
            let entry = groups.entry(row.variable.clone()).or_default();
            if let Some(v) = row.value {
                entry.push(v);
            }
        }
        groups
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new([self.var_name.as_str(), self.value_name.as_str()]);
        for row in &self.rows {
            table.push_row([
                row.variable.clone(),
                row.value.map(format_float).unwrap_or_default(),
            ]);
        }
        table
    }
}

/// Model name from a header like `Factuality on GPT-4`; the header itself
/// when it does not follow that convention.
pub fn extract_model_name(header: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)factuality on (.+)").expect("static regex"));
    re.captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| header.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide() -> Table {
        let mut t = Table::new(["id", "Factuality on GPT-4", "factuality on Llama 3"]);
        t.push_row(["1", "0.9", "0.7"]);
        t.push_row(["2", "", "0.6"]);
        t
    }

    #[test]
    fn test_melt_is_column_major_and_keeps_gaps() {
        let t = wide();
        let cols = vec!["Factuality on GPT-4".to_string(), "factuality on Llama 3".to_string()];
        let long = melt(&t, &cols, "RawModelCol", "Factuality").unwrap();

        assert_eq!(long.rows.len(), 4);
        assert_eq!(long.rows[0].value, Some(0.9));
        assert_eq!(long.rows[1].value, None);
        assert_eq!(long.rows[2].variable, "factuality on Llama 3");
    }

    #[test]
    fn test_relabel_and_group() {
        let t = wide();
        let cols = vec!["Factuality on GPT-4".to_string(), "factuality on Llama 3".to_string()];
        let groups = melt(&t, &cols, "RawModelCol", "Factuality")
            .unwrap()
            .relabel(extract_model_name)
            .groups();

        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["GPT-4", "Llama 3"]);
        assert_eq!(groups["GPT-4"], vec![0.9]);
        assert_eq!(groups["Llama 3"], vec![0.7, 0.6]);
    }

    #[test]
    fn test_extract_model_name() {
        assert_eq!(extract_model_name("Factuality on GPT-4"), "GPT-4");
        assert_eq!(extract_model_name("FACTUALITY ON claude-3.7"), "claude-3.7");
        assert_eq!(extract_model_name("factuality_score"), "factuality_score");
    }

    #[test]
    fn test_to_table() {
        let t = wide();
        let long = melt(&t, &["Factuality on GPT-4".to_string()], "Model", "Score").unwrap();
        let table = long.to_table();
        assert_eq!(table.headers(), &["Model", "Score"]);
        assert_eq!(table.cell(1, "Score"), Some(""));
    }
}
