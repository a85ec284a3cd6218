//! One-way analysis of variance across customer groups

use crate::analysis::stats::mean;
use crate::structs::AnovaResult;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Significance level for the `significant` flag
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

impl AnovaResult {
    fn undefined() -> Self {
        Self {
            f_statistic: None,
            p_value: None,
            significant: false,
        }
    }

    fn from_p(f_statistic: Option<f64>, p_value: f64) -> Self {
        let p_value = p_value.clamp(0.0, 1.0);
        Self {
            f_statistic,
            p_value: Some(p_value),
            significant: p_value < SIGNIFICANCE_LEVEL,
        }
    }
}

/// One-way ANOVA over the given groups; empty groups are ignored.
///
/// Undefined tests (fewer than two groups, no residual degrees of freedom,
/// or no variance at all) yield `None` statistic and p-value. Perfectly
/// separated groups (zero within-group variance) yield p = 0 with no finite
/// F statistic.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn one_way_anova(groups: &[Vec<f64>]) -> AnovaResult {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    let n: usize = groups.iter().map(|g| g.len()).sum();

    if k < 2 || n <= k {
        return AnovaResult::undefined();
    }

    let all: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let grand_mean = mean(&all);

    let ss_between: f64 = groups
        .iter()
        .map(|g| g.len() as f64 * (mean(g) - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .map(|g| {
            let m = mean(g);
            g.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        })
        .sum();

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;

    if ss_within <= f64::EPSILON * ss_between.abs().max(1.0) {
        return if ss_between > 0.0 {
            AnovaResult::from_p(None, 0.0)
        } else {
            AnovaResult::undefined()
        };
    }

    let f = (ss_between / df_between) / (ss_within / df_within);
    match FisherSnedecor::new(df_between, df_within) {
        Ok(dist) => AnovaResult::from_p(Some(f), dist.sf(f)),
        Err(_) => AnovaResult::undefined(),
    }
}
