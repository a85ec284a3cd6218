//! Customer segmentation over transaction tables.
//!
//! Per-customer recency, frequency and monetary metrics are extracted from
//! order line items, then segmented either by quartile rules (with one-way
//! ANOVA validation) or by k-means, Ward hierarchical or DBSCAN clustering
//! with the usual validity indices.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args, clippy::module_name_repetitions)]

pub mod analysis;
pub mod csv_reader;
pub mod error;
pub mod structs;

pub use analysis::clustering::{
    cluster_customers, ClusterMethod, ClusterModel, ClusteringConfig, ClusteringOutcome,
};
pub use analysis::metrics::{extract_metrics, filter_outliers, parse_transactions};
pub use analysis::overview::DatasetSummary;
pub use analysis::pipeline::AnalysisConfig;
pub use analysis::segmentation::{segment_customers, RfmSegmentation};
pub use analysis::taxonomy::{Segment, SegmentTaxonomy, StandardTaxonomy};
pub use csv_reader::CsvData;
pub use error::{Result, RfmError};
pub use structs::{MetricTable, RfmMetric, TransactionRecord};
