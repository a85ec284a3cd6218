//! Analysis pipeline from a loaded transaction table to results

use crate::analysis::clustering::{cluster_customers, ClusterMethod, ClusteringConfig, ClusteringOutcome};
use crate::analysis::metrics::{extract_metrics, parse_transactions, IQR_MULTIPLIER};
use crate::analysis::segmentation::{segment_customers, RfmSegmentation};
use crate::analysis::taxonomy::StandardTaxonomy;
use crate::csv_reader::CsvData;
use crate::error::Result;
use crate::structs::MetricTable;

/// Configuration for the analysis pipeline
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Tukey fence multiplier for customer outlier removal
    pub iqr_multiplier: f64,
    pub clustering: ClusteringConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: IQR_MULTIPLIER,
            clustering: ClusteringConfig::default(),
        }
    }
}

/// Segmentation together with the metric table it was computed from
#[derive(Debug, Clone)]
pub struct RfmAnalysis {
    pub table: MetricTable,
    pub segmentation: RfmSegmentation,
}

/// Clustering together with the metric table it was computed from
#[derive(Debug, Clone)]
pub struct ClusteringAnalysis {
    pub table: MetricTable,
    pub outcome: ClusteringOutcome,
}

/// Parse transactions and extract the outlier-filtered metric table
///
/// # Errors
/// Returns error if the table fails validation or no customers remain
pub fn load_metrics(csv: &CsvData, config: &AnalysisConfig) -> Result<MetricTable> {
    let records = parse_transactions(csv)?;
    extract_metrics(&records, config.iqr_multiplier)
}

/// Run the quartile segmentation with the standard taxonomy
///
/// # Errors
/// Returns error if extraction fails or the metrics are too coarse to score
pub fn run_rfm(csv: &CsvData, config: &AnalysisConfig) -> Result<RfmAnalysis> {
    let table = load_metrics(csv, config)?;
    let segmentation = segment_customers(&table, &StandardTaxonomy)?;

    tracing::info!(
        customers = segmentation.total_customers,
        segments = segmentation.segment_distribution.len(),
        "RFM segmentation complete"
    );
    Ok(RfmAnalysis {
        table,
        segmentation,
    })
}

/// Run one clustering method on the extracted metrics
///
/// # Errors
/// Returns error if extraction fails or the method cannot run on the data
pub fn run_clustering(
    csv: &CsvData,
    method: ClusterMethod,
    config: &AnalysisConfig,
) -> Result<ClusteringAnalysis> {
    let table = load_metrics(csv, config)?;
    let outcome = cluster_customers(&table, method, &config.clustering)?;

    match &outcome {
        ClusteringOutcome::Clustered(model) => tracing::info!(
            method = %method,
            clusters = model.quality.optimal_clusters,
            silhouette = ?model.quality.silhouette,
            "clustering complete"
        ),
        ClusteringOutcome::InsufficientSeparation { clusters_found, .. } => tracing::warn!(
            method = %method,
            clusters = clusters_found,
            "clustering produced no usable result"
        ),
    }
    Ok(ClusteringAnalysis { table, outcome })
}
