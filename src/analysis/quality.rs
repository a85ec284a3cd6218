//! Cluster validity indices on standardized features

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

fn euclidean_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Number of distinct labels, assuming labels are `0..k`
fn label_count(labels: &[usize]) -> usize {
    labels.iter().max().map_or(0, |&m| m + 1)
}

/// Per-cluster centroids and member counts
#[allow(clippy::cast_precision_loss)]
fn centroids(data: ArrayView2<f64>, labels: &[usize], k: usize) -> (Array2<f64>, Vec<usize>) {
    let mut sums = Array2::<f64>::zeros((k, data.ncols()));
    let mut counts = vec![0usize; k];
    for (row, &label) in data.axis_iter(Axis(0)).zip(labels) {
        let mut target = sums.row_mut(label);
        target += &row;
        counts[label] += 1;
    }
    for (mut row, &count) in sums.axis_iter_mut(Axis(0)).zip(&counts) {
        if count > 0 {
            row /= count as f64;
        }
    }
    (sums, counts)
}

/// Mean silhouette coefficient.
///
/// `None` unless there are between 2 and `n - 1` non-empty clusters.
/// Members of singleton clusters score 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn silhouette_score(data: ArrayView2<f64>, labels: &[usize]) -> Option<f64> {
    let n = labels.len();
    let k = label_count(labels);
    let mut counts = vec![0usize; k];
    for &label in labels {
        counts[label] += 1;
    }
    let non_empty = counts.iter().filter(|&&c| c > 0).count();
    if non_empty < 2 || non_empty > n.saturating_sub(1) {
        return None;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0; k];
    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[labels[j]] += euclidean_distance(data.row(i), data.row(j));
            }
        }

        let own = labels[i];
        if counts[own] <= 1 {
            continue;
        }
        let a = sums[own] / (counts[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && counts[c] > 0)
            .map(|c| sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Some(total / n as f64)
}

/// Davies–Bouldin index (lower is better); `None` below two clusters.
///
/// Coincident centroids are treated as infinitely far apart.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn davies_bouldin_score(data: ArrayView2<f64>, labels: &[usize]) -> Option<f64> {
    let k = label_count(labels);
    let (centers, counts) = centroids(data, labels, k);
    let active: Vec<usize> = (0..k).filter(|&c| counts[c] > 0).collect();
    if active.len() < 2 {
        return None;
    }

    let mut scatter = vec![0.0; k];
    for (row, &label) in data.axis_iter(Axis(0)).zip(labels) {
        scatter[label] += euclidean_distance(row, centers.row(label));
    }
    for &c in &active {
        scatter[c] /= counts[c] as f64;
    }

    let worst: f64 = active
        .iter()
        .map(|&i| {
            active
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| {
                    let separation = euclidean_distance(centers.row(i), centers.row(j));
                    if separation > 0.0 {
                        (scatter[i] + scatter[j]) / separation
                    } else {
                        0.0
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();

    Some(worst / active.len() as f64)
}

/// Calinski–Harabasz variance ratio (higher is better).
///
/// `None` unless there are between 2 and `n - 1` clusters; 1.0 when every
/// cluster is a single repeated point.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calinski_harabasz_score(data: ArrayView2<f64>, labels: &[usize]) -> Option<f64> {
    let n = labels.len();
    let k = label_count(labels);
    let (centers, counts) = centroids(data, labels, k);
    let active = counts.iter().filter(|&&c| c > 0).count();
    if active < 2 || active >= n {
        return None;
    }

    let overall: Array1<f64> = data.mean_axis(Axis(0))?;

    let between: f64 = (0..k)
        .filter(|&c| counts[c] > 0)
        .map(|c| counts[c] as f64 * euclidean_distance(centers.row(c), overall.view()).powi(2))
        .sum();
    let within: f64 = data
        .axis_iter(Axis(0))
        .zip(labels)
        .map(|(row, &label)| euclidean_distance(row, centers.row(label)).powi(2))
        .sum();

    if within == 0.0 {
        return Some(1.0);
    }
    Some(between * (n - active) as f64 / (within * (active - 1) as f64))
}

/// Within-cluster sum of squared distances to the given centroids
#[must_use]
pub fn inertia(data: ArrayView2<f64>, labels: &[usize], centers: ArrayView2<f64>) -> f64 {
    data.axis_iter(Axis(0))
        .zip(labels)
        .map(|(row, &label)| euclidean_distance(row, centers.row(label)).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_pairs() -> (Array2<f64>, Vec<usize>) {
        (array![[0.0], [1.0], [10.0], [11.0]], vec![0, 0, 1, 1])
    }

    #[test]
    fn test_silhouette_known_value() {
        let (data, labels) = two_pairs();
        let s = silhouette_score(data.view(), &labels).expect("silhouette");

        let expected = (2.0 - 1.0 / 10.5 - 1.0 / 9.5) / 2.0;
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn test_silhouette_undefined_for_one_cluster() {
        let (data, _) = two_pairs();
        assert_eq!(silhouette_score(data.view(), &[0, 0, 0, 0]), None);
        assert_eq!(silhouette_score(data.view(), &[0, 1, 2, 3]), None);
    }

    #[test]
    fn test_silhouette_singleton_scores_zero() {
        let data = array![[0.0], [1.0], [50.0]];
        let s = silhouette_score(data.view(), &[0, 0, 1]).expect("silhouette");

        // Two members of cluster 0 score (b - a) / b, the singleton scores 0
        let expected = ((1.0 - 1.0 / 50.0) + (1.0 - 1.0 / 49.0)) / 3.0;
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn test_davies_bouldin_known_value() {
        let (data, labels) = two_pairs();
        let db = davies_bouldin_score(data.view(), &labels).expect("db");
        assert!((db - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_calinski_harabasz_known_value() {
        let (data, labels) = two_pairs();
        let ch = calinski_harabasz_score(data.view(), &labels).expect("ch");
        assert!((ch - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_calinski_harabasz_zero_dispersion() {
        let data = array![[0.0], [0.0], [3.0], [3.0]];
        assert_eq!(calinski_harabasz_score(data.view(), &[0, 0, 1, 1]), Some(1.0));
    }

    #[test]
    fn test_inertia() {
        let (data, labels) = two_pairs();
        let centers = array![[0.5], [10.5]];
        assert!((inertia(data.view(), &labels, centers.view()) - 1.0).abs() < 1e-12);
    }
}
