use crate::analysis::stats::median;
use crate::structs::MetricTable;
use ndarray::{Array1, Array2, Axis};

/// Standardized feature matrix
#[derive(Debug, Clone)]
pub struct ScaledFeatures {
    /// `(n_customers, 3)`, zero mean and unit variance per column
    pub data: Array2<f64>,
}

impl ScaledFeatures {
    /// Impute, then standardize the raw metrics of `table`
    #[must_use]
    pub fn from_table(table: &MetricTable) -> Self {
        let mut raw = table.feature_matrix();
        impute_median(&mut raw);
        standardize(&raw)
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }
}

/// Replace non-finite cells with the median of their column's finite values
pub fn impute_median(matrix: &mut Array2<f64>) {
    for mut column in matrix.axis_iter_mut(Axis(1)) {
        let values: Vec<f64> = column.iter().copied().collect();
        let fill = median(&values).unwrap_or(0.0);
        column
            .iter_mut()
            .filter(|v| !v.is_finite())
            .for_each(|v| *v = fill);
    }
}

/// Standardize columns to zero mean and unit population variance.
///
/// Scales are population standard deviations; constant columns are only
/// centred.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn standardize(matrix: &Array2<f64>) -> ScaledFeatures {
    let n = matrix.nrows().max(1) as f64;
    let means = matrix
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(matrix.ncols()));

    let centered = matrix - &means;
    let scales = centered.map_axis(Axis(0), |col| {
        let std = (col.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        if std > 0.0 {
            std
        } else {
            1.0
        }
    });

    ScaledFeatures {
        data: centered / &scales,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::RfmMetric;
    use ndarray::array;

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let matrix = array![[1.0, 10.0, 5.0], [2.0, 20.0, 5.0], [3.0, 30.0, 5.0], [4.0, 40.0, 5.0]];
        let scaled = standardize(&matrix);

        for col in scaled.data.axis_iter(Axis(1)).take(2) {
            let mean = col.sum() / 4.0;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
        // Constant column becomes all zeros
        assert!(scaled.data.column(2).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_impute_median() {
        let mut matrix = array![[1.0, f64::NAN], [3.0, 2.0], [f64::NAN, 4.0], [5.0, 9.0]];
        impute_median(&mut matrix);

        assert!((matrix[[2, 0]] - 3.0).abs() < 1e-12);
        assert!((matrix[[0, 1]] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_table_scales_each_metric() {
        let table = MetricTable::new(vec![
            RfmMetric::new("A", 10, 1, 100.0),
            RfmMetric::new("B", 20, 3, 300.0),
            RfmMetric::new("C", 30, 5, 200.0),
        ]);
        let scaled = ScaledFeatures::from_table(&table);

        assert_eq!(scaled.n_samples(), 3);
        // Recency 10/20/30: population std is sqrt(200/3)
        let expected = 10.0 / (200.0_f64 / 3.0).sqrt();
        assert!((scaled.data[[2, 0]] - expected).abs() < 1e-9);
        assert!(scaled.data[[1, 0]].abs() < 1e-12);
    }
}
