//! Transaction parsing and per-customer RFM metric extraction

use crate::csv_reader::{CsvData, REQUIRED_COLUMNS};
use crate::error::{Result, RfmError};
use crate::structs::{ColumnStats, Metric, MetricTable, RfmMetric, TransactionRecord};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Default Tukey fence multiplier for outlier removal
pub const IQR_MULTIPLIER: f64 = 1.5;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse an order date in one of the accepted layouts
#[must_use]
pub fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc())
}

/// Blank or unparsable numbers become missing values
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integers, or floats with no fractional part ("3.0")
#[allow(clippy::cast_possible_truncation)]
fn parse_quantity(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        parse_number(raw)
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Convert a loaded table into typed transaction records
///
/// # Errors
/// Returns `DataValidation` if a required column is absent, the table is
/// empty, or a row has no customer id or an unreadable order date
pub fn parse_transactions(csv: &CsvData) -> Result<Vec<TransactionRecord>> {
    let missing = csv.missing_columns(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Err(RfmError::DataValidation(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }
    if csv.rows.is_empty() {
        return Err(RfmError::DataValidation(
            "Transaction table has no rows".into(),
        ));
    }

    // All present, checked above
    let index: Vec<usize> = REQUIRED_COLUMNS
        .iter()
        .filter_map(|name| csv.column_index(name))
        .collect();
    let cell = |row: &[String], col: usize| -> String {
        row.get(index[col]).map_or(String::new(), |s| s.trim().to_string())
    };

    let mut records = Vec::with_capacity(csv.row_count());
    for (row_idx, row) in csv.rows.iter().enumerate() {
        let line = row_idx + 2;

        let customer_id = cell(row, 0);
        if customer_id.is_empty() {
            return Err(RfmError::DataValidation(format!(
                "Row {line}: customer_id is blank"
            )));
        }

        let raw_date = cell(row, 2);
        let order_date = parse_order_date(&raw_date).ok_or_else(|| {
            RfmError::DataValidation(format!("Row {line}: cannot parse order_date '{raw_date}'"))
        })?;

        records.push(TransactionRecord {
            customer_id,
            order_id: cell(row, 1),
            order_date,
            product_id: cell(row, 3),
            quantity: parse_quantity(&cell(row, 4)),
            unit_price: parse_number(&cell(row, 5)),
            total_amount: parse_number(&cell(row, 6)),
        });
    }

    Ok(records)
}

#[derive(Default)]
struct CustomerTotals {
    last_order: Option<NaiveDateTime>,
    line_items: usize,
    monetary: f64,
}

/// Aggregate transactions into one raw metric row per customer.
///
/// Rows are ordered by customer id. The reference date is one day after the
/// latest order in the input.
///
/// # Errors
/// Returns `DataValidation` if `records` is empty
pub fn compute_metrics(records: &[TransactionRecord]) -> Result<MetricTable> {
    let latest = records
        .iter()
        .map(|r| r.order_date)
        .max()
        .ok_or_else(|| RfmError::DataValidation("No transactions supplied".into()))?;
    let reference = latest + Duration::days(1);

    let mut totals: BTreeMap<&str, CustomerTotals> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(record.customer_id.as_str()).or_default();
        entry.last_order = entry.last_order.max(Some(record.order_date));
        entry.line_items += 1;
        if let Some(amount) = record.total_amount {
            entry.monetary += amount;
        }
    }

    let rows = totals
        .into_iter()
        .filter_map(|(customer_id, t)| {
            t.last_order.map(|last| {
                RfmMetric::new(
                    customer_id,
                    (reference - last).num_days(),
                    t.line_items,
                    t.monetary,
                )
            })
        })
        .collect();

    Ok(MetricTable::new(rows))
}

/// Drop every customer with any metric outside its Tukey fences.
///
/// Fences are computed per metric over the whole input table.
#[must_use]
pub fn filter_outliers(table: &MetricTable, multiplier: f64) -> MetricTable {
    let stats: Vec<(Metric, ColumnStats)> = Metric::ALL
        .iter()
        .filter_map(|&metric| {
            ColumnStats::calculate(metric.name(), &table.values(metric))
                .ok()
                .map(|s| (metric, s))
        })
        .collect();

    for (_, s) in &stats {
        tracing::debug!(fences = ?s.fences(multiplier), "{}", s.summary());
    }

    let kept = table
        .iter()
        .filter(|row| {
            stats
                .iter()
                .all(|(metric, s)| !s.is_outlier(metric.value(row), multiplier))
        })
        .cloned()
        .collect();

    MetricTable::new(kept)
}

/// Full extraction: aggregate, then remove outlying customers
///
/// # Errors
/// Returns `DataValidation` for empty input and `InsufficientData` when no
/// customer survives outlier removal
pub fn extract_metrics(records: &[TransactionRecord], multiplier: f64) -> Result<MetricTable> {
    let raw = compute_metrics(records)?;
    let cleaned = filter_outliers(&raw, multiplier);

    tracing::info!(
        transactions = records.len(),
        customers = raw.len(),
        retained = cleaned.len(),
        "extracted RFM metrics"
    );

    if cleaned.is_empty() {
        return Err(RfmError::InsufficientData(
            "No customers remain after outlier removal".into(),
        ));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(customer: &str, order: &str, date: &str, amount: Option<f64>) -> TransactionRecord {
        TransactionRecord {
            customer_id: customer.to_string(),
            order_id: order.to_string(),
            order_date: parse_order_date(date).expect("date"),
            product_id: "P1".to_string(),
            quantity: Some(1),
            unit_price: amount,
            total_amount: amount,
        }
    }

    #[test]
    fn test_parse_order_date_formats() {
        assert!(parse_order_date("2024-03-01").is_some());
        assert!(parse_order_date("2024-03-01 10:15:00").is_some());
        assert!(parse_order_date("2024-03-01T10:15:00").is_some());
        assert!(parse_order_date("2024-03-01T10:15:00Z").is_some());
        assert!(parse_order_date("03/01/2024").is_none());
    }

    #[test]
    fn test_parse_transactions_coerces_amounts() {
        let csv = CsvData::from_reader(
            "customer_id,order_id,order_date,product_id,quantity,unit_price,total_amount\n\
             C1,O1,2024-01-01,P1,2,5.0,10.0\n\
             C1,O2,2024-01-05,P2,x,abc,n/a\n"
                .as_bytes(),
            false,
        )
        .expect("csv");

        let records = parse_transactions(&csv).expect("parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quantity, Some(2));
        assert_eq!(records[0].total_amount, Some(10.0));
        assert_eq!(records[1].quantity, None);
        assert_eq!(records[1].total_amount, None);
    }

    #[test]
    fn test_parse_transactions_missing_column() {
        let csv = CsvData::from_reader(
            "customer_id,order_id,order_date\nC1,O1,2024-01-01\n".as_bytes(),
            false,
        )
        .expect("csv");

        let err = parse_transactions(&csv).unwrap_err();
        assert!(matches!(err, RfmError::DataValidation(ref msg) if msg.contains("total_amount")));
    }

    #[test]
    fn test_parse_transactions_bad_date() {
        let csv = CsvData::from_reader(
            "customer_id,order_id,order_date,product_id,quantity,unit_price,total_amount\n\
             C1,O1,yesterday,P1,1,1,1\n"
                .as_bytes(),
            false,
        )
        .expect("csv");

        assert!(matches!(
            parse_transactions(&csv),
            Err(RfmError::DataValidation(_))
        ));
    }

    #[test]
    fn test_compute_metrics() {
        let records = vec![
            record("C2", "O1", "2024-01-10", Some(100.0)),
            record("C1", "O2", "2024-01-01", Some(20.0)),
            record("C1", "O3", "2024-01-05", Some(30.0)),
            record("C1", "O3", "2024-01-05", None),
        ];

        let table = compute_metrics(&records).expect("metrics");

        assert_eq!(table.len(), 2);
        let c1 = table.get("C1").expect("C1");
        // Reference date is 2024-01-11
        assert_eq!(c1.recency, 6);
        assert_eq!(c1.frequency, 3);
        assert!((c1.monetary - 50.0).abs() < 1e-9);

        let c2 = table.get("C2").expect("C2");
        assert_eq!(c2.recency, 1);
        assert_eq!(c2.frequency, 1);
        assert_eq!(table.rows()[0].customer_id, "C1");
    }

    #[test]
    fn test_frequency_counts_line_items_not_orders() {
        let records = vec![
            record("C1", "O1", "2024-01-01", Some(5.0)),
            record("C1", "O1", "2024-01-01", Some(7.0)),
        ];

        let table = compute_metrics(&records).expect("metrics");
        assert_eq!(table.rows()[0].frequency, 2);
    }

    #[test]
    fn test_compute_metrics_empty_input() {
        assert!(matches!(
            compute_metrics(&[]),
            Err(RfmError::DataValidation(_))
        ));
    }

    #[test]
    fn test_filter_outliers_drops_any_metric_outlier() {
        let mut rows: Vec<RfmMetric> = (0..10)
            .map(|i| RfmMetric::new(format!("C{i}"), 10 + i, 5, 100.0 + i as f64))
            .collect();
        rows.push(RfmMetric::new("WHALE", 12, 5, 10_000.0));
        let table = MetricTable::new(rows);

        let cleaned = filter_outliers(&table, IQR_MULTIPLIER);

        assert_eq!(cleaned.len(), 10);
        assert!(cleaned.get("WHALE").is_none());
    }

    #[test]
    fn test_extract_metrics_keeps_uniform_customers() {
        let records: Vec<TransactionRecord> = (1..=9)
            .map(|d| record(&format!("C{d}"), "O", &format!("2024-01-0{d}"), Some(10.0)))
            .collect();

        let table = extract_metrics(&records, IQR_MULTIPLIER).expect("extract");
        assert_eq!(table.len(), 9);
    }
}
