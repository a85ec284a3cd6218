//! Quartile scoring of RFM metrics

use crate::analysis::stats::percentile;
use crate::error::{Result, RfmError};
use crate::structs::{Metric, MetricTable};

/// Number of equal-population score bins
pub const QUARTILES: usize = 4;

/// 1-based ranks, ascending, ties broken by first occurrence
#[must_use]
pub fn rank_first(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // sort_by is stable, so equal values keep their input order
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0; values.len()];
    for (position, &idx) in order.iter().enumerate() {
        ranks[idx] = position + 1;
    }
    ranks
}

/// Assign each value to one of four equal-population bins (1..=4, ascending).
///
/// Bin edges are the quartiles of the rank sequence; a rank falls in the
/// first bin whose upper edge it does not exceed.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn quartile_bins(values: &[f64]) -> Vec<u8> {
    let ranks = rank_first(values);
    let sorted_ranks: Vec<f64> = (1..=values.len()).map(|r| r as f64).collect();
    let upper_edges: Vec<f64> = (1..QUARTILES)
        .map(|q| percentile(&sorted_ranks, 100.0 * q as f64 / QUARTILES as f64))
        .collect();

    ranks
        .into_iter()
        .map(|rank| {
            let rank = rank as f64;
            let below = upper_edges.iter().filter(|&&edge| rank > edge).count();
            (below + 1) as u8
        })
        .collect()
}

/// Per-customer quartile scores `(recency, frequency, monetary)`.
///
/// Recency is inverted so the most recent customers score 4.
///
/// # Errors
/// Returns `InsufficientData` if any metric has fewer than four distinct values
pub fn score_metrics(table: &MetricTable) -> Result<Vec<[u8; 3]>> {
    for metric in Metric::ALL {
        let distinct = distinct_count(&table.values(metric));
        if distinct < QUARTILES {
            return Err(RfmError::InsufficientData(format!(
                "{} has {distinct} distinct values, need at least {QUARTILES} for quartile scoring",
                metric.name()
            )));
        }
    }

    let recency = quartile_bins(&table.values(Metric::Recency));
    let frequency = quartile_bins(&table.values(Metric::Frequency));
    let monetary = quartile_bins(&table.values(Metric::Monetary));

    #[allow(clippy::cast_possible_truncation)]
    let invert = |bin: u8| QUARTILES as u8 + 1 - bin;

    Ok(recency
        .into_iter()
        .zip(frequency)
        .zip(monetary)
        .map(|((r, f), m)| [invert(r), f, m])
        .collect())
}

/// Composite code such as `"434"`
#[must_use]
pub fn composite_code(scores: [u8; 3]) -> String {
    scores.iter().map(u8::to_string).collect()
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::RfmMetric;

    #[test]
    fn test_rank_first_breaks_ties_by_position() {
        let ranks = rank_first(&[5.0, 1.0, 5.0, 3.0, 1.0]);
        assert_eq!(ranks, vec![4, 1, 5, 3, 2]);
    }

    #[test]
    fn test_quartile_bins_equal_population() {
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        assert_eq!(quartile_bins(&values), vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_quartile_bins_uneven_size() {
        // Edges over ranks 1..=10 are 3.25, 5.5 and 7.75
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(quartile_bins(&values), vec![1, 1, 1, 2, 2, 3, 3, 4, 4, 4]);
    }

    #[test]
    fn test_tied_values_split_by_first_seen() {
        // All equal: bins follow input order only
        let bins = quartile_bins(&[7.0, 7.0, 7.0, 7.0]);
        assert_eq!(bins, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_score_metrics_inverts_recency() {
        let table = MetricTable::new(vec![
            RfmMetric::new("A", 1, 1, 10.0),
            RfmMetric::new("B", 2, 2, 20.0),
            RfmMetric::new("C", 3, 3, 30.0),
            RfmMetric::new("D", 4, 4, 40.0),
        ]);

        let scores = score_metrics(&table).expect("scores");

        assert_eq!(scores[0], [4, 1, 1]);
        assert_eq!(scores[3], [1, 4, 4]);
        assert_eq!(composite_code(scores[0]), "411");
    }

    #[test]
    fn test_score_metrics_needs_four_distinct_values() {
        let table = MetricTable::new(vec![
            RfmMetric::new("A", 1, 1, 10.0),
            RfmMetric::new("B", 2, 1, 20.0),
            RfmMetric::new("C", 3, 2, 30.0),
            RfmMetric::new("D", 4, 3, 40.0),
        ]);

        assert!(matches!(
            score_metrics(&table),
            Err(RfmError::InsufficientData(ref msg)) if msg.contains("frequency")
        ));
    }
}
