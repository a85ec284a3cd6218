//! Serializable analysis records and output file writers

use crate::analysis::clustering::{ClusterModel, ClusteringOutcome, ElbowCurve};
use crate::analysis::overview::DatasetSummary;
use crate::analysis::segmentation::RfmSegmentation;
use crate::error::Result;
use crate::structs::{AnovaResult, MetricTable, SegmentStatistics};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// JSON output structures

/// Rule-based segmentation result
#[derive(Debug, Clone, Serialize)]
pub struct RfmRecord {
    pub segment_statistics: BTreeMap<String, SegmentStatistics>,
    pub statistical_validation: StatisticalValidation,
    pub segment_distribution: BTreeMap<String, usize>,
    pub total_customers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticalValidation {
    pub anova_results: BTreeMap<String, AnovaResult>,
}

impl From<&RfmSegmentation> for RfmRecord {
    fn from(result: &RfmSegmentation) -> Self {
        Self {
            segment_statistics: result.segment_statistics.clone(),
            statistical_validation: StatisticalValidation {
                anova_results: result
                    .anova
                    .iter()
                    .map(|(metric, anova)| (metric.name().to_string(), *anova))
                    .collect(),
            },
            segment_distribution: result.segment_distribution.clone(),
            total_customers: result.total_customers,
        }
    }
}

/// Clustering result, or the reason no clustering was produced
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClusteringRecord {
    Clustered(ClusteredRecord),
    InsufficientSeparation(SeparationRecord),
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteredRecord {
    pub method: String,
    pub optimal_clusters: usize,
    /// Per-customer cluster ids, `-1` for noise
    pub cluster_labels: Vec<i64>,
    pub silhouette_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub davies_bouldin_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calinski_harabasz_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elbow_data: Option<ElbowData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_points: Option<usize>,
    pub cluster_statistics: BTreeMap<String, SegmentStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElbowData {
    pub k_values: Vec<usize>,
    pub inertias: Vec<f64>,
    pub silhouette_scores: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeparationRecord {
    pub method: String,
    pub error: String,
    pub clusters_found: usize,
    pub noise_points: usize,
}

impl From<&ElbowCurve> for ElbowData {
    fn from(curve: &ElbowCurve) -> Self {
        Self {
            k_values: curve.k_values.clone(),
            inertias: curve.inertias.clone(),
            silhouette_scores: curve.silhouette_scores.clone(),
        }
    }
}

impl From<&ClusterModel> for ClusteredRecord {
    fn from(model: &ClusterModel) -> Self {
        Self {
            method: model.method.display_name().to_string(),
            optimal_clusters: model.quality.optimal_clusters,
            cluster_labels: model.assignments().iter().map(|a| a.label()).collect(),
            silhouette_score: model.quality.silhouette,
            davies_bouldin_score: model.quality.davies_bouldin,
            calinski_harabasz_score: model.quality.calinski_harabasz,
            elbow_data: model.elbow.as_ref().map(ElbowData::from),
            noise_points: model.noise_points,
            cluster_statistics: model
                .cluster_statistics
                .iter()
                .map(|(id, stats)| (format!("cluster_{id}"), stats.clone()))
                .collect(),
        }
    }
}

impl From<&ClusteringOutcome> for ClusteringRecord {
    fn from(outcome: &ClusteringOutcome) -> Self {
        match outcome {
            ClusteringOutcome::Clustered(model) => Self::Clustered(model.into()),
            ClusteringOutcome::InsufficientSeparation {
                method,
                clusters_found,
                noise_points,
            } => Self::InsufficientSeparation(SeparationRecord {
                method: method.display_name().to_string(),
                error: format!("{method} could not find meaningful clusters"),
                clusters_found: *clusters_found,
                noise_points: *noise_points,
            }),
        }
    }
}

// CSV output rows

#[derive(Serialize)]
struct SegmentRow<'a> {
    customer_id: &'a str,
    code: &'a str,
    segment: &'a str,
    recency: i64,
    frequency: usize,
    monetary: f64,
}

#[derive(Serialize)]
struct ClusterRow<'a> {
    customer_id: &'a str,
    cluster: i64,
}

/// Write a record as pretty JSON to `output_dir/name`
///
/// # Errors
/// Returns error if serialization or the write fails
pub fn write_json<T: Serialize>(output_dir: &Path, name: &str, record: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    fs::write(output_dir.join(name), json)?;
    Ok(())
}

/// Write `segments.csv` - quartile code and segment per customer
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_segments(
    output_dir: &Path,
    table: &MetricTable,
    segmentation: &RfmSegmentation,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join("segments.csv"))?;
    for (row, score) in table.iter().zip(&segmentation.scores) {
        writer.serialize(SegmentRow {
            customer_id: &row.customer_id,
            code: &score.code,
            segment: &score.segment,
            recency: row.recency,
            frequency: row.frequency,
            monetary: row.monetary,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `clusters.csv` - cluster assignment for each customer
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_clusters(output_dir: &Path, model: &ClusterModel) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join("clusters.csv"))?;
    for assignment in model.assignments() {
        writer.serialize(ClusterRow {
            customer_id: &assignment.customer_id,
            cluster: assignment.label(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `summary.txt` - human readable overview
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_summary(output_dir: &Path, content: &str) -> Result<()> {
    fs::write(output_dir.join("summary.txt"), content)?;
    Ok(())
}

fn format_score(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

/// Summary text for a dataset overview
#[must_use]
pub fn dataset_summary_text(summary: &DatasetSummary) -> String {
    format!(
        "Dataset: {} records, {} customers\nOrders from {} to {}\nColumns: {}\nData quality: {:.2}%\n",
        summary.total_records,
        summary.total_customers,
        summary.date_range.start_date,
        summary.date_range.end_date,
        summary.columns.join(", "),
        summary.data_quality_score
    )
}

/// Summary text for a rule-based segmentation
#[must_use]
pub fn rfm_summary_text(record: &RfmRecord) -> String {
    use std::fmt::Write as _;

    let mut s = format!(
        "RFM segmentation: {} customers in {} segments\n",
        record.total_customers,
        record.segment_distribution.len()
    );
    for (segment, count) in &record.segment_distribution {
        let _ = writeln!(s, "  {segment}: {count}");
    }
    let _ = writeln!(s, "ANOVA:");
    for (metric, anova) in &record.statistical_validation.anova_results {
        let _ = writeln!(
            s,
            "  {metric}: F={}, p={}, significant={}",
            format_score(anova.f_statistic),
            format_score(anova.p_value),
            anova.significant
        );
    }
    s
}

/// Summary text for a clustering run
#[must_use]
pub fn clustering_summary_text(record: &ClusteringRecord) -> String {
    use std::fmt::Write as _;

    match record {
        ClusteringRecord::Clustered(r) => {
            let mut s = format!("{} clustering with {} clusters\n", r.method, r.optimal_clusters);
            let _ = writeln!(s, "  silhouette: {}", format_score(r.silhouette_score));
            let _ = writeln!(s, "  davies-bouldin: {}", format_score(r.davies_bouldin_score));
            let _ = writeln!(
                s,
                "  calinski-harabasz: {}",
                format_score(r.calinski_harabasz_score)
            );
            if let Some(noise) = r.noise_points {
                let _ = writeln!(s, "  noise points: {noise}");
            }
            for (cluster, stats) in &r.cluster_statistics {
                let _ = writeln!(s, "  {cluster}: {} customers", stats.customer_count);
            }
            s
        }
        ClusteringRecord::InsufficientSeparation(r) => format!(
            "{}: {} ({} clusters, {} noise points)\n",
            r.method, r.error, r.clusters_found, r.noise_points
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::clustering::ClusterMethod;
    use crate::structs::{ClusterQuality, RfmMetric};
    use tempfile::TempDir;

    fn dbscan_model() -> ClusterModel {
        let stats = SegmentStatistics::from_members(&[&RfmMetric::new("A", 1, 1, 1.0)]).expect("stats");
        ClusterModel {
            method: ClusterMethod::Dbscan,
            customer_ids: vec!["A".into(), "B".into(), "C".into()],
            labels: vec![Some(0), None, Some(1)],
            quality: ClusterQuality {
                optimal_clusters: 2,
                silhouette: Some(0.5),
                davies_bouldin: None,
                calinski_harabasz: None,
            },
            elbow: None,
            noise_points: Some(1),
            cluster_statistics: BTreeMap::from([(0, stats.clone()), (1, stats)]),
        }
    }

    #[test]
    fn test_clustered_record_shape() {
        let record = ClusteringRecord::from(&ClusteringOutcome::Clustered(dbscan_model()));
        let json = serde_json::to_value(&record).expect("json");

        assert_eq!(json["method"], "DBSCAN");
        assert_eq!(json["cluster_labels"], serde_json::json!([0, -1, 1]));
        assert_eq!(json["noise_points"], 1);
        assert!(json.get("davies_bouldin_score").is_none());
        assert!(json.get("elbow_data").is_none());
        assert!(json["cluster_statistics"]["cluster_0"]["recency_std"].is_null());
    }

    #[test]
    fn test_insufficient_separation_record() {
        let outcome = ClusteringOutcome::InsufficientSeparation {
            method: ClusterMethod::Dbscan,
            clusters_found: 1,
            noise_points: 4,
        };
        let json = serde_json::to_value(ClusteringRecord::from(&outcome)).expect("json");

        assert_eq!(json["error"], "DBSCAN could not find meaningful clusters");
        assert_eq!(json["clusters_found"], 1);
        assert!(json.get("cluster_labels").is_none());
    }

    #[test]
    fn test_write_clusters_marks_noise() {
        let dir = TempDir::new().expect("create temp dir");
        write_clusters(dir.path(), &dbscan_model()).expect("write clusters");

        let content = fs::read_to_string(dir.path().join("clusters.csv")).expect("read");
        assert_eq!(content, "customer_id,cluster\nA,0\nB,-1\nC,1\n");
    }

    #[test]
    fn test_write_summary() {
        let dir = TempDir::new().expect("create temp dir");
        write_summary(dir.path(), "Test summary content").expect("write summary");

        let content = fs::read_to_string(dir.path().join("summary.txt")).expect("read");
        assert_eq!(content, "Test summary content");
    }

    #[test]
    fn test_summary_text_for_clustering() {
        let record = ClusteringRecord::from(&ClusteringOutcome::Clustered(dbscan_model()));
        let text = clustering_summary_text(&record);

        assert!(text.starts_with("DBSCAN clustering with 2 clusters"));
        assert!(text.contains("davies-bouldin: n/a"));
        assert!(text.contains("noise points: 1"));
    }
}
