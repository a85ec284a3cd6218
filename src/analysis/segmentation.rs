//! Rule-based RFM segmentation with significance testing

use crate::analysis::anova::one_way_anova;
use crate::analysis::scoring::{composite_code, score_metrics};
use crate::analysis::taxonomy::SegmentTaxonomy;
use crate::error::Result;
use crate::structs::{AnovaResult, Metric, MetricTable, RfmMetric, RfmScore, SegmentStatistics};
use std::collections::BTreeMap;

/// Outcome of quartile-rule segmentation over one metric table
#[derive(Debug, Clone)]
pub struct RfmSegmentation {
    /// One score per customer, in table order
    pub scores: Vec<RfmScore>,
    pub segment_distribution: BTreeMap<String, usize>,
    /// Statistics for every non-empty segment
    pub segment_statistics: BTreeMap<String, SegmentStatistics>,
    pub anova: BTreeMap<Metric, AnovaResult>,
    pub total_customers: usize,
}

impl RfmSegmentation {
    /// Segment label for a customer
    #[must_use]
    pub fn segment_of(&self, customer_id: &str) -> Option<&str> {
        self.scores
            .iter()
            .find(|s| s.customer_id == customer_id)
            .map(|s| s.segment.as_str())
    }
}

/// Score, label and test every customer of `table`
///
/// # Errors
/// Returns `InsufficientData` if quartile scoring is impossible
pub fn segment_customers<T>(table: &MetricTable, taxonomy: &T) -> Result<RfmSegmentation>
where
    T: SegmentTaxonomy + ?Sized,
{
    let quartiles = score_metrics(table)?;

    let scores: Vec<RfmScore> = table
        .iter()
        .zip(quartiles)
        .map(|(row, q)| {
            let code = composite_code(q);
            RfmScore {
                customer_id: row.customer_id.clone(),
                recency_quartile: q[0],
                frequency_quartile: q[1],
                monetary_quartile: q[2],
                segment: taxonomy.segment_for(&code).to_string(),
                code,
            }
        })
        .collect();

    let mut members: BTreeMap<&str, Vec<&RfmMetric>> = BTreeMap::new();
    for (row, score) in table.iter().zip(&scores) {
        members.entry(score.segment.as_str()).or_default().push(row);
    }

    let segment_distribution = members
        .iter()
        .map(|(label, rows)| ((*label).to_string(), rows.len()))
        .collect();

    let segment_statistics = members
        .iter()
        .filter_map(|(label, rows)| {
            SegmentStatistics::from_members(rows).map(|s| ((*label).to_string(), s))
        })
        .collect();

    let anova = Metric::ALL
        .iter()
        .map(|&metric| {
            let groups: Vec<Vec<f64>> = members
                .values()
                .map(|rows| rows.iter().map(|r| metric.value(r)).collect())
                .collect();
            (metric, one_way_anova(&groups))
        })
        .collect();

    tracing::info!(
        customers = table.len(),
        segments = members.len(),
        "segmented customers"
    );

    Ok(RfmSegmentation {
        scores,
        segment_distribution,
        segment_statistics,
        anova,
        total_customers: table.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::taxonomy::StandardTaxonomy;

    fn ladder(n: i64) -> MetricTable {
        // Customer i is both the most recent and the biggest spender as i grows
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let rows = (0..n)
            .map(|i| RfmMetric::new(format!("C{i:03}"), n - i, (i + 1) as usize, 10.0 * (i + 1) as f64))
            .collect();
        MetricTable::new(rows)
    }

    #[test]
    fn test_monotone_ladder_segments() {
        let result = segment_customers(&ladder(8), &StandardTaxonomy).expect("segment");

        assert_eq!(result.total_customers, 8);
        assert_eq!(result.segment_of("C007"), Some("Champions"));
        assert_eq!(result.segment_of("C000"), Some("Lost"));
        assert_eq!(result.scores[7].code, "444");
        assert_eq!(result.scores[0].code, "111");
        assert_eq!(result.segment_distribution.get("Champions"), Some(&2));
        assert_eq!(result.segment_distribution.get("Loyal Customers"), Some(&2));
        assert_eq!(result.segment_distribution.get("About to Sleep"), Some(&2));
        assert_eq!(result.segment_distribution.get("Lost"), Some(&2));
    }

    #[test]
    fn test_distribution_sums_to_total() {
        let result = segment_customers(&ladder(37), &StandardTaxonomy).expect("segment");

        let sum: usize = result.segment_distribution.values().sum();
        assert_eq!(sum, result.total_customers);
        let stats_sum: usize = result
            .segment_statistics
            .values()
            .map(|s| s.customer_count)
            .sum();
        assert_eq!(stats_sum, 37);
    }

    #[test]
    fn test_anova_is_reported_for_each_metric() {
        let result = segment_customers(&ladder(40), &StandardTaxonomy).expect("segment");

        assert_eq!(result.anova.len(), 3);
        for anova in result.anova.values() {
            let f = anova.f_statistic.expect("f");
            let p = anova.p_value.expect("p");
            assert!(f >= 0.0);
            assert!((0.0..=1.0).contains(&p));
            assert_eq!(anova.significant, p < 0.05);
        }
    }

    struct Binary;

    impl SegmentTaxonomy for Binary {
        fn segment_for(&self, code: &str) -> &str {
            if code.starts_with('4') {
                "Active"
            } else {
                "Dormant"
            }
        }

        fn labels(&self) -> Vec<&str> {
            vec!["Active", "Dormant"]
        }
    }

    #[test]
    fn test_custom_taxonomy_keeps_scores() {
        let standard = segment_customers(&ladder(8), &StandardTaxonomy).expect("standard");
        let custom = segment_customers(&ladder(8), &Binary).expect("custom");

        assert_eq!(custom.segment_distribution.get("Active"), Some(&2));
        assert_eq!(custom.segment_distribution.get("Dormant"), Some(&6));
        let codes = |s: &RfmSegmentation| s.scores.iter().map(|x| x.code.clone()).collect::<Vec<_>>();
        assert_eq!(codes(&standard), codes(&custom));
    }
}
