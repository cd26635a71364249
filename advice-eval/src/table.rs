//! In-memory CSV table shared by every pipeline stage
//!
//! Cells are kept as strings; an empty cell means "not available". Stages
//! only ever append or replace whole columns, so row order and row count are
//! stable from one stage to the next.

use std::io::{Read, Write};
use std::path::Path;

/// Error type for table operations
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Row {row} has {actual} fields, header has {expected}")]
    RowTooLong {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Column '{column}' has {actual} values, table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

pub type TableResult<T> = Result<T, TableError>;

/// A header row plus string cells, row-major
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given headers
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with empty cells; extra cells are
    /// dropped with a warning. Use [`Table::try_push_row`] to reject them.
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        if row[self.headers.len().min(row.len())..].iter().any(|c| !c.is_empty()) {
            tracing::warn!(
                "Dropping {} cell(s) past the last header in row {}",
                row.len() - self.headers.len(),
                self.rows.len() + 1
            );
        }
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Append a row, failing when it has more cells than there are headers
    pub fn try_push_row<I, S>(&mut self, cells: I) -> TableResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        if row.len() > self.headers.len() {
            return Err(TableError::RowTooLong {
                row: self.rows.len() + 1,
                expected: self.headers.len(),
                actual: row.len(),
            });
        }
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
        Ok(())
    }

    /// Read a table from a CSV file with a header row
    pub fn read_csv(path: impl AsRef<Path>) -> TableResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let table = Self::from_reader(file)?;
        tracing::debug!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Read a table from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> TableResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut table = Self::new(headers);

        for record in rdr.records() {
            let record = record?;
            table.try_push_row(record.iter())?;
        }

        Ok(table)
    }

    /// Write the table as CSV, creating parent directories when needed
    pub fn write_csv(&self, path: impl AsRef<Path>) -> TableResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.to_writer(file)?;
        tracing::debug!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    /// Write the table as CSV to any sink
    pub fn to_writer<W: Write>(&self, writer: W) -> TableResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Borrow a column's cells in row order
    pub fn column(&self, name: &str) -> TableResult<Vec<&str>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Cell lookup by row position and header
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Append a column, or replace its cells in place if the header already exists
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> TableResult<()> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Set a column of optional strings; `None` becomes an empty cell
    pub fn set_optional_column(&mut self, name: &str, values: Vec<Option<String>>) -> TableResult<()> {
        self.set_column(name, values.into_iter().map(Option::unwrap_or_default).collect())
    }

    /// Set a column of optional floats; `None` becomes an empty cell
    pub fn set_float_column(&mut self, name: &str, values: &[Option<f64>]) -> TableResult<()> {
        let cells = values
            .iter()
            .map(|v| v.map(format_float).unwrap_or_default())
            .collect();
        self.set_column(name, cells)
    }

    /// Parse a column to floats. Empty, NaN and unparseable cells are `None`.
    pub fn numeric_column(&self, name: &str) -> TableResult<Vec<Option<f64>>> {
        Ok(self.column(name)?.into_iter().map(parse_float).collect())
    }

    /// Parse several columns at once, preserving the requested order
    pub fn numeric_columns(&self, names: &[String]) -> TableResult<Vec<Vec<Option<f64>>>> {
        names.iter().map(|n| self.numeric_column(n)).collect()
    }
}

/// Parse a CSV cell as a float
pub fn parse_float(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Format a float for a CSV cell. Uses the shortest representation that
/// parses back to the same value.
pub fn format_float(value: f64) -> String {
    format!("{}", value)
}
