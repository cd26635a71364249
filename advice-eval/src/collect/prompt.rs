//! Prompt construction from query rows

use crate::table::{Table, TableError, TableResult};

pub const QUERY_COLUMN: &str = "patient_query";
pub const CATEGORY_COLUMN: &str = "category";
pub const SOURCE_COLUMN: &str = "source";
pub const SUBMITTED_AT_COLUMN: &str = "submitted_at";

const HEADER: &str = "A patient is asking for healthcare advice.\n";
const INSTRUCTIONS: &str = "\n\nPlease provide a clear, helpful, and safe response. \
Use plain language that a layperson can understand, and avoid giving \
specific diagnoses or treatment plans without advising the patient \
to consult a qualified healthcare professional.";

/// One patient question. Identity is the row position in the source table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRecord {
    pub patient_query: String,
    pub category: Option<String>,
    pub source: Option<String>,
    pub submitted_at: Option<String>,
}

impl QueryRecord {
    pub fn new(patient_query: impl Into<String>) -> Self {
        Self {
            patient_query: patient_query.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Read every row of `table`. Only `patient_query` is required.
    pub fn from_table(table: &Table) -> TableResult<Vec<Self>> {
        if !table.has_column(QUERY_COLUMN) {
            return Err(TableError::MissingColumn(QUERY_COLUMN.to_string()));
        }

        let optional = |row: usize, col: &str| table.cell(row, col).map(str::to_string);

        Ok((0..table.len())
            .map(|row| Self {
                patient_query: table.cell(row, QUERY_COLUMN).unwrap_or_default().to_string(),
                category: optional(row, CATEGORY_COLUMN),
                source: optional(row, SOURCE_COLUMN),
                submitted_at: optional(row, SUBMITTED_AT_COLUMN),
            })
            .collect())
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Build the prompt for one query.
///
/// Layout: fixed header, the question, optional `Topic:` and `Source type:`
/// lines (only for non-blank fields, in that order), then the safety
/// instructions.
pub fn build_prompt(record: &QueryRecord) -> String {
    let question = record.patient_query.trim();

    let mut extras = Vec::new();
    if let Some(category) = non_empty(&record.category) {
        extras.push(format!("Topic: {}", category));
    }
    if let Some(source) = non_empty(&record.source) {
        extras.push(format!("Source type: {}", source));
    }

    let context = if extras.is_empty() {
        String::new()
    } else {
        format!("\n{}", extras.join("\n"))
    };

    format!("{}Patient question: {}{}{}", HEADER, question, context, INSTRUCTIONS)
}
