//! Customer clustering on standardized RFM features

use crate::analysis::features::ScaledFeatures;
use crate::analysis::hierarchical::ward_clusters;
use crate::analysis::quality::{
    calinski_harabasz_score, davies_bouldin_score, inertia, silhouette_score,
};
use crate::error::{Result, RfmError};
use crate::structs::{
    ClusterAssignment, ClusterQuality, MetricTable, RfmMetric, SegmentStatistics,
};
use linfa::traits::{Fit, Predict, Transformer};
use linfa::{DatasetBase, ParamGuard};
use linfa_clustering::{Dbscan, KMeans};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported clustering algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterMethod {
    KMeans,
    Hierarchical,
    Dbscan,
}

impl ClusterMethod {
    /// Name used in reports
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::KMeans => "K-Means",
            Self::Hierarchical => "Hierarchical",
            Self::Dbscan => "DBSCAN",
        }
    }
}

impl fmt::Display for ClusterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ClusterMethod {
    type Err = RfmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kmeans" => Ok(Self::KMeans),
            "hierarchical" => Ok(Self::Hierarchical),
            "dbscan" => Ok(Self::Dbscan),
            other => Err(RfmError::Algorithm(format!(
                "'{other}' (expected kmeans, hierarchical or dbscan)"
            ))),
        }
    }
}

/// Tunables for the clustering paths
#[derive(Debug, Clone)]
pub struct ClusteringConfig {
    /// Seed for k-means initialisation
    pub seed: u64,
    pub k_min: usize,
    pub k_max: usize,
    /// Independent k-means initialisations per fit
    pub n_runs: usize,
    pub max_iterations: u64,
    pub tolerance: f64,
    pub hierarchical_clusters: usize,
    pub dbscan_eps: f64,
    pub dbscan_min_points: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            k_min: 2,
            k_max: 10,
            n_runs: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            hierarchical_clusters: 5,
            dbscan_eps: 0.5,
            dbscan_min_points: 5,
        }
    }
}

/// Inertia and silhouette for each scanned k
#[derive(Debug, Clone, PartialEq)]
pub struct ElbowCurve {
    pub k_values: Vec<usize>,
    pub inertias: Vec<f64>,
    pub silhouette_scores: Vec<Option<f64>>,
}

/// A usable clustering of the customers
#[derive(Debug, Clone)]
pub struct ClusterModel {
    pub method: ClusterMethod,
    pub customer_ids: Vec<String>,
    /// Per-customer cluster, `None` for noise
    pub labels: Vec<Option<usize>>,
    pub quality: ClusterQuality,
    /// Present for k-means only
    pub elbow: Option<ElbowCurve>,
    /// Present for DBSCAN only
    pub noise_points: Option<usize>,
    /// Raw-metric statistics per cluster id, noise excluded
    pub cluster_statistics: BTreeMap<usize, SegmentStatistics>,
}

impl ClusterModel {
    #[must_use]
    pub fn assignments(&self) -> Vec<ClusterAssignment> {
        self.customer_ids
            .iter()
            .zip(&self.labels)
            .map(|(id, &cluster)| ClusterAssignment {
                customer_id: id.clone(),
                cluster,
            })
            .collect()
    }
}

/// Result of one clustering run
#[derive(Debug, Clone)]
pub enum ClusteringOutcome {
    Clustered(ClusterModel),
    /// Fewer than two clusters were found; quality scores are undefined
    InsufficientSeparation {
        method: ClusterMethod,
        clusters_found: usize,
        noise_points: usize,
    },
}

/// Cluster the customers of `table` with `method`
///
/// # Errors
/// Returns `InsufficientData` when the table is too small for the method
/// and `Clustering` if a fit fails
pub fn cluster_customers(
    table: &MetricTable,
    method: ClusterMethod,
    config: &ClusteringConfig,
) -> Result<ClusteringOutcome> {
    let features = ScaledFeatures::from_table(table);
    tracing::info!(method = %method, customers = table.len(), "clustering customers");

    match method {
        ClusterMethod::KMeans => run_kmeans(table, &features, config),
        ClusterMethod::Hierarchical => run_hierarchical(table, &features, config),
        ClusterMethod::Dbscan => run_dbscan(table, &features, config),
    }
}

/// Fit seeded k-means, keeping the best of `n_runs` initialisations.
///
/// Returns labels and inertia.
///
/// # Errors
/// Returns `Clustering` if linfa rejects the parameters or the fit fails
pub fn fit_kmeans(
    data: &Array2<f64>,
    k: usize,
    config: &ClusteringConfig,
) -> Result<(Vec<usize>, f64)> {
    let dataset = DatasetBase::from(data.clone());
    let rng = StdRng::seed_from_u64(config.seed);

    let model = KMeans::params_with(k, rng, L2Dist)
        .n_runs(config.n_runs)
        .max_n_iterations(config.max_iterations)
        .tolerance(config.tolerance)
        .fit(&dataset)
        .map_err(|e| RfmError::Clustering(format!("K-means failed for k={k}: {e}")))?;

    let predictions: Array1<usize> = model.predict(data);
    let labels: Vec<usize> = predictions.iter().copied().collect();
    let wcss = inertia(data.view(), &labels, model.centroids().view());
    Ok((labels, wcss))
}

fn run_kmeans(
    table: &MetricTable,
    features: &ScaledFeatures,
    config: &ClusteringConfig,
) -> Result<ClusteringOutcome> {
    let n = features.n_samples();
    let k_max = config.k_max.min(n.saturating_sub(1));
    if n < 3 || config.k_min > k_max {
        return Err(RfmError::InsufficientData(format!(
            "K-means needs at least {} customers, got {n}",
            config.k_min.max(2) + 1
        )));
    }

    let mut curve = ElbowCurve {
        k_values: Vec::new(),
        inertias: Vec::new(),
        silhouette_scores: Vec::new(),
    };
    for k in config.k_min..=k_max {
        let (labels, wcss) = fit_kmeans(&features.data, k, config)?;
        let silhouette = silhouette_score(features.data.view(), &labels);
        tracing::debug!(k, inertia = wcss, silhouette = ?silhouette, "k-means candidate");

        curve.k_values.push(k);
        curve.inertias.push(wcss);
        curve.silhouette_scores.push(silhouette);
    }

    let best_k = select_k(&curve.k_values, &curve.silhouette_scores).unwrap_or(config.k_min);
    let (labels, _) = fit_kmeans(&features.data, best_k, config)?;

    let quality = ClusterQuality {
        optimal_clusters: best_k,
        silhouette: silhouette_score(features.data.view(), &labels),
        davies_bouldin: davies_bouldin_score(features.data.view(), &labels),
        calinski_harabasz: calinski_harabasz_score(features.data.view(), &labels),
    };
    tracing::info!(k = best_k, silhouette = ?quality.silhouette, "selected k by silhouette");

    Ok(ClusteringOutcome::Clustered(build_model(
        table,
        ClusterMethod::KMeans,
        labels.into_iter().map(Some).collect(),
        quality,
        Some(curve),
        None,
    )))
}

/// k with the highest silhouette; the lowest k wins ties
#[must_use]
pub fn select_k(k_values: &[usize], silhouettes: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (&k, score) in k_values.iter().zip(silhouettes) {
        let Some(score) = *score else { continue };
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((k, score));
        }
    }
    best.map(|(k, _)| k)
}

fn run_hierarchical(
    table: &MetricTable,
    features: &ScaledFeatures,
    config: &ClusteringConfig,
) -> Result<ClusteringOutcome> {
    let n = features.n_samples();
    let k = config.hierarchical_clusters;
    if n <= k {
        return Err(RfmError::InsufficientData(format!(
            "Hierarchical clustering into {k} clusters needs more than {k} customers, got {n}"
        )));
    }

    let labels = ward_clusters(features.data.view(), k);
    let quality = ClusterQuality {
        optimal_clusters: k,
        silhouette: silhouette_score(features.data.view(), &labels),
        davies_bouldin: davies_bouldin_score(features.data.view(), &labels),
        calinski_harabasz: calinski_harabasz_score(features.data.view(), &labels),
    };

    Ok(ClusteringOutcome::Clustered(build_model(
        table,
        ClusterMethod::Hierarchical,
        labels.into_iter().map(Some).collect(),
        quality,
        None,
        None,
    )))
}

fn run_dbscan(
    table: &MetricTable,
    features: &ScaledFeatures,
    config: &ClusteringConfig,
) -> Result<ClusteringOutcome> {
    let params = Dbscan::params(config.dbscan_min_points)
        .tolerance(config.dbscan_eps)
        .check()
        .map_err(|e| RfmError::Clustering(format!("DBSCAN params invalid: {e}")))?;

    let clusters: Array1<Option<usize>> = params.transform(&features.data);
    let labels: Vec<Option<usize>> = clusters.iter().copied().collect();

    let mut distinct: Vec<usize> = labels.iter().flatten().copied().collect();
    distinct.sort_unstable();
    distinct.dedup();
    let n_clusters = distinct.len();
    let n_noise = labels.iter().filter(|l| l.is_none()).count();

    if n_clusters < 2 {
        tracing::warn!(
            clusters = n_clusters,
            noise = n_noise,
            eps = config.dbscan_eps,
            "DBSCAN found no meaningful separation"
        );
        return Ok(ClusteringOutcome::InsufficientSeparation {
            method: ClusterMethod::Dbscan,
            clusters_found: n_clusters,
            noise_points: n_noise,
        });
    }

    // Noise scores as one extra group
    let noise_group = distinct.iter().max().map_or(0, |m| m + 1);
    let scored: Vec<usize> = labels.iter().map(|l| l.unwrap_or(noise_group)).collect();

    let quality = ClusterQuality {
        optimal_clusters: n_clusters,
        silhouette: silhouette_score(features.data.view(), &scored),
        davies_bouldin: None,
        calinski_harabasz: None,
    };

    Ok(ClusteringOutcome::Clustered(build_model(
        table,
        ClusterMethod::Dbscan,
        labels,
        quality,
        None,
        Some(n_noise),
    )))
}

fn build_model(
    table: &MetricTable,
    method: ClusterMethod,
    labels: Vec<Option<usize>>,
    quality: ClusterQuality,
    elbow: Option<ElbowCurve>,
    noise_points: Option<usize>,
) -> ClusterModel {
    let mut members: BTreeMap<usize, Vec<&RfmMetric>> = BTreeMap::new();
    for (row, label) in table.iter().zip(&labels) {
        if let Some(cluster) = label {
            members.entry(*cluster).or_default().push(row);
        }
    }

    let cluster_statistics = members
        .into_iter()
        .filter_map(|(cluster, rows)| SegmentStatistics::from_members(&rows).map(|s| (cluster, s)))
        .collect();

    ClusterModel {
        method,
        customer_ids: table.iter().map(|r| r.customer_id.clone()).collect(),
        labels,
        quality,
        elbow,
        noise_points,
        cluster_statistics,
    }
}
