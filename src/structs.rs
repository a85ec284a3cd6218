//! Consolidated public types for the rfmseg crate
//!
//! Transactions come in, per-customer metric tables flow through the
//! segmenter and the clustering engine, and the score / statistics types
//! below come out.

use chrono::NaiveDateTime;
use ndarray::Array2;
use serde::Serialize;

/// Label used for DBSCAN noise points in serialized cluster label sequences
pub const NOISE_LABEL: i64 = -1;

// ============================================================================
// Transaction Types
// ============================================================================

/// One line item of an order, as loaded from the transaction table
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub customer_id: String,
    pub order_id: String,
    pub order_date: NaiveDateTime,
    pub product_id: String,
    /// `None` when the source value was blank or not an integer
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    /// `None` when the source value was blank or not numeric
    pub total_amount: Option<f64>,
}

// ============================================================================
// Metric Types
// ============================================================================

/// The three RFM dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl Metric {
    pub const ALL: [Self; 3] = [Self::Recency, Self::Frequency, Self::Monetary];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Recency => "recency",
            Self::Frequency => "frequency",
            Self::Monetary => "monetary",
        }
    }

    /// Read this dimension off a customer metric
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(self, metric: &RfmMetric) -> f64 {
        match self {
            Self::Recency => metric.recency as f64,
            Self::Frequency => metric.frequency as f64,
            Self::Monetary => metric.monetary,
        }
    }
}

/// Recency / frequency / monetary triple for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct RfmMetric {
    pub customer_id: String,
    /// Whole days between the reference date and the latest order
    pub recency: i64,
    /// Number of line items
    pub frequency: usize,
    /// Sum of line-item totals
    pub monetary: f64,
}

impl RfmMetric {
    #[must_use]
    pub fn new(customer_id: impl Into<String>, recency: i64, frequency: usize, monetary: f64) -> Self {
        Self {
            customer_id: customer_id.into(),
            recency,
            frequency,
            monetary,
        }
    }
}

/// Per-customer metric table, one row per customer.
///
/// Row order is significant: quartile ranking breaks ties by it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    rows: Vec<RfmMetric>,
}

impl MetricTable {
    #[must_use]
    pub fn new(rows: Vec<RfmMetric>) -> Self {
        Self { rows }
    }

    /// Number of customers
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[RfmMetric] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RfmMetric> {
        self.rows.iter()
    }

    /// One dimension as a column of floats, in row order
    #[must_use]
    pub fn values(&self, metric: Metric) -> Vec<f64> {
        self.rows.iter().map(|row| metric.value(row)).collect()
    }

    /// Raw `(n_customers, 3)` matrix with columns recency, frequency, monetary
    #[must_use]
    pub fn feature_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows.len(), Metric::ALL.len()), |(i, j)| {
            Metric::ALL[j].value(&self.rows[i])
        })
    }

    /// Look up a customer by id
    #[must_use]
    pub fn get(&self, customer_id: &str) -> Option<&RfmMetric> {
        self.rows.iter().find(|row| row.customer_id == customer_id)
    }
}

impl<'a> IntoIterator for &'a MetricTable {
    type Item = &'a RfmMetric;
    type IntoIter = std::slice::Iter<'a, RfmMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Descriptive statistics for one numeric column
#[derive(Debug, Clone)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
}

impl ColumnStats {
    /// Tukey fences `[Q1 - m*IQR, Q3 + m*IQR]`
    #[must_use]
    pub fn fences(&self, multiplier: f64) -> (f64, f64) {
        (
            self.q1 - multiplier * self.iqr,
            self.q3 + multiplier * self.iqr,
        )
    }

    /// Whether `value` lies outside the fences
    #[must_use]
    pub fn is_outlier(&self, value: f64, multiplier: f64) -> bool {
        let (lower, upper) = self.fences(multiplier);
        value < lower || value > upper
    }

    /// Format as a summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: n={}, mean={:.2}, std={:.2}, min={:.2}, Q1={:.2}, median={:.2}, Q3={:.2}, max={:.2}, IQR={:.2}",
            self.name, self.count, self.mean, self.std_dev, self.min, self.q1, self.median, self.q3, self.max, self.iqr
        )
    }
}

// ============================================================================
// Segmentation Types
// ============================================================================

/// Quartile scores and segment for one customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfmScore {
    pub customer_id: String,
    pub recency_quartile: u8,
    pub frequency_quartile: u8,
    pub monetary_quartile: u8,
    /// Concatenated digits, e.g. `"434"`
    pub code: String,
    pub segment: String,
}

/// Mean / std / count of the raw metrics over a group of customers.
///
/// Standard deviations use one delta degree of freedom and are `None` for
/// single-member groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStatistics {
    pub recency_mean: f64,
    pub recency_std: Option<f64>,
    pub frequency_mean: f64,
    pub frequency_std: Option<f64>,
    pub monetary_mean: f64,
    pub monetary_std: Option<f64>,
    pub customer_count: usize,
}

/// One-way ANOVA outcome for a single metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnovaResult {
    pub f_statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub significant: bool,
}

// ============================================================================
// Clustering Types
// ============================================================================

/// Cluster membership for one customer; `None` marks DBSCAN noise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    pub customer_id: String,
    pub cluster: Option<usize>,
}

impl ClusterAssignment {
    /// Integer label with noise mapped to [`NOISE_LABEL`]
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn label(&self) -> i64 {
        self.cluster.map_or(NOISE_LABEL, |c| c as i64)
    }
}

/// Cluster validity indices for one clustering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterQuality {
    pub optimal_clusters: usize,
    pub silhouette: Option<f64>,
    pub davies_bouldin: Option<f64>,
    pub calinski_harabasz: Option<f64>,
}
