use crate::error::{Result, RfmError};
use crate::structs::{ColumnStats, Metric, RfmMetric, SegmentStatistics};

impl ColumnStats {
    /// Calculate statistics for a vector of values
    ///
    /// # Errors
    /// Returns error if values is empty
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate(name: &str, values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(RfmError::InsufficientData(format!(
                "Cannot calculate stats for empty column '{name}'"
            )));
        }

        let count = values.len();
        let mean = mean(values);

        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
        let std_dev = variance.sqrt();

        let sorted = sorted_copy(values);

        let min = sorted[0];
        let max = sorted[count - 1];

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;

        Ok(Self {
            name: name.to_string(),
            count,
            mean,
            std_dev,
            min,
            max,
            q1,
            median,
            q3,
            iqr,
        })
    }
}

impl SegmentStatistics {
    /// Summarise a group of customers; `None` for an empty group
    #[must_use]
    pub fn from_members(members: &[&RfmMetric]) -> Option<Self> {
        if members.is_empty() {
            return None;
        }

        let column = |metric: Metric| -> Vec<f64> {
            members.iter().map(|m| metric.value(m)).collect()
        };
        let recency = column(Metric::Recency);
        let frequency = column(Metric::Frequency);
        let monetary = column(Metric::Monetary);

        Some(Self {
            recency_mean: mean(&recency),
            recency_std: sample_std(&recency),
            frequency_mean: mean(&frequency),
            frequency_std: sample_std(&frequency),
            monetary_mean: mean(&monetary),
            monetary_std: sample_std(&monetary),
            customer_count: members.len(),
        })
    }
}

/// Arithmetic mean; NaN for an empty slice
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with one delta degree of freedom.
///
/// Undefined (`None`) below two observations.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss = values.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Median of the finite values, `None` when there are none
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(percentile(&sorted_copy(&finite), 50.0))
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Calculate percentile of sorted data using linear interpolation
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let k = (p / 100.0) * (sorted.len() - 1) as f64;
    let f = k.floor() as usize;
    let c = k.ceil() as usize;

    if f == c {
        sorted[f]
    } else {
        let d0 = sorted[f] * (c as f64 - k);
        let d1 = sorted[c] * (k - f as f64);
        d0 + d1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_stats() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let stats = ColumnStats::calculate("test", &values).expect("calculate stats");

        assert_eq!(stats.count, 10);
        assert!((stats.mean - 5.5).abs() < 0.01);
        assert!((stats.min - 1.0).abs() < 0.01);
        assert!((stats.max - 10.0).abs() < 0.01);
        assert!((stats.median - 5.5).abs() < 0.01);
        assert!((stats.q1 - 3.25).abs() < 1e-9);
        assert!((stats.q3 - 7.75).abs() < 1e-9);
    }

    #[test]
    fn test_outlier_fences() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let stats = ColumnStats::calculate("test", &values).expect("calculate stats");

        assert!(stats.is_outlier(100.0, 1.5));
        assert!(!stats.is_outlier(5.0, 1.5));
        let (lower, upper) = stats.fences(1.5);
        assert!(lower < 1.0 && upper < 100.0);
    }

    #[test]
    fn test_empty_column_is_rejected() {
        assert!(ColumnStats::calculate("empty", &[]).is_err());
    }

    #[test]
    fn test_sample_std_uses_ddof_one() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).expect("std");
        assert!((std - 2.138_089_935).abs() < 1e-6);
        assert_eq!(sample_std(&[3.0]), None);
    }

    #[test]
    fn test_median_skips_nan() {
        assert_eq!(median(&[f64::NAN, 1.0, 3.0]), Some(2.0));
        assert_eq!(median(&[f64::NAN]), None);
    }

    #[test]
    fn test_segment_statistics_singleton_has_no_std() {
        let m = RfmMetric::new("C1", 10, 2, 50.0);
        let stats = SegmentStatistics::from_members(&[&m]).expect("stats");

        assert_eq!(stats.customer_count, 1);
        assert!((stats.recency_mean - 10.0).abs() < 1e-9);
        assert_eq!(stats.recency_std, None);
        assert_eq!(stats.monetary_std, None);
        assert!(SegmentStatistics::from_members(&[]).is_none());
    }
}
