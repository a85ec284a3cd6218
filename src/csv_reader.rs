use crate::error::Result;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// Columns every transaction table must carry
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "customer_id",
    "order_id",
    "order_date",
    "product_id",
    "quantity",
    "unit_price",
    "total_amount",
];

/// Represents a parsed CSV/TSV file with headers and rows
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvData {
    /// Parse a CSV or TSV file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or is malformed
    pub fn from_file(path: &Path, is_tsv: bool) -> Result<Self> {
        let reader = builder(is_tsv).from_path(path)?;
        Self::collect(reader)
    }

    /// Parse CSV or TSV content from any reader
    ///
    /// # Errors
    /// Returns error if the content is malformed
    pub fn from_reader<R: Read>(source: R, is_tsv: bool) -> Result<Self> {
        let reader = builder(is_tsv).from_reader(source);
        Self::collect(reader)
    }

    fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(ToString::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Get number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.headers.len()
    }

    /// Get column index by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get a column as a vector of strings
    #[must_use]
    pub fn column(&self, index: usize) -> Option<Vec<&str>> {
        if index >= self.headers.len() {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map_or("", String::as_str))
                .collect(),
        )
    }

    /// Required column names that are absent from the header
    #[must_use]
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.column_index(name).is_none())
            .collect()
    }

    /// Count blank cells, treating short rows as blank-padded
    #[must_use]
    pub fn empty_cell_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| {
                let blank = row.iter().filter(|cell| cell.trim().is_empty()).count();
                blank + self.col_count().saturating_sub(row.len())
            })
            .sum()
    }
}

fn builder(is_tsv: bool) -> ReaderBuilder {
    let delimiter = if is_tsv { b'\t' } else { b',' };
    let mut builder = ReaderBuilder::new();
    builder.delimiter(delimiter).has_headers(true).flexible(true);
    builder
}
