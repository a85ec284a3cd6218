//! Dataset overview for an uploaded transaction table

use crate::analysis::metrics::parse_order_date;
use crate::csv_reader::{CsvData, REQUIRED_COLUMNS};
use crate::error::{Result, RfmError};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

/// Row, customer and completeness counts for a transaction table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub total_customers: usize,
    pub date_range: DateRange,
    pub columns: Vec<String>,
    /// Percentage of non-empty cells, two decimals
    pub data_quality_score: f64,
}

impl DatasetSummary {
    /// Summarize a loaded table
    ///
    /// # Errors
    /// Returns `DataValidation` if any required column is missing or no
    /// order date can be parsed
    #[allow(clippy::cast_precision_loss)]
    pub fn from_csv(csv: &CsvData) -> Result<Self> {
        let missing = csv.missing_columns(&REQUIRED_COLUMNS);
        if !missing.is_empty() {
            return Err(RfmError::DataValidation(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        let column = |name: &str| {
            csv.column_index(name)
                .and_then(|idx| csv.column(idx))
                .ok_or_else(|| RfmError::DataValidation(format!("Missing required column: {name}")))
        };

        let customers: BTreeSet<&str> = column("customer_id")?
            .into_iter()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect();

        let dates: Vec<_> = column("order_date")?
            .into_iter()
            .filter_map(parse_order_date)
            .collect();
        let (Some(start), Some(end)) = (dates.iter().min(), dates.iter().max()) else {
            return Err(RfmError::DataValidation(
                "No parsable order dates in table".into(),
            ));
        };

        let total_cells = csv.row_count() * csv.col_count();
        let data_quality_score = if total_cells == 0 {
            0.0
        } else {
            let complete = 1.0 - csv.empty_cell_count() as f64 / total_cells as f64;
            (complete * 10_000.0).round() / 100.0
        };

        Ok(Self {
            total_records: csv.row_count(),
            total_customers: customers.len(),
            date_range: DateRange {
                start_date: start.format("%Y-%m-%d").to_string(),
                end_date: end.format("%Y-%m-%d").to_string(),
            },
            columns: csv.headers.clone(),
            data_quality_score,
        })
    }
}
