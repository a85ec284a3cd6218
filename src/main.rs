#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use rfmseg::analysis::output::{self, ClusteringRecord, RfmRecord};
use rfmseg::analysis::pipeline::{self, AnalysisConfig};
use rfmseg::{ClusterMethod, ClusteringConfig, ClusteringOutcome, CsvData, DatasetSummary};
use rfmseg::{Result, RfmError};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// rfmseg - RFM customer segmentation and clustering
#[derive(Parser, Debug)]
#[command(name = "rfmseg")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Input options shared by every subcommand
#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Transaction CSV/TSV file
    #[arg(short, long)]
    csv: PathBuf,

    /// Treat input as TSV instead of CSV
    #[arg(long)]
    tsv: bool,

    /// Output directory for result files
    #[arg(short, long, default_value = "./rfm_output")]
    output_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize the transaction table
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Quartile-rule RFM segmentation with ANOVA validation
    Rfm {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Cluster customers on standardized RFM features
    Cluster {
        #[command(flatten)]
        input: InputArgs,

        /// Clustering method: kmeans, hierarchical or dbscan
        #[arg(short, long, default_value = "kmeans")]
        method: String,

        /// Seed for k-means initialisation
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of clusters for hierarchical clustering
        #[arg(short = 'k', long, default_value = "5")]
        clusters: usize,

        /// DBSCAN neighbourhood radius on standardized features
        #[arg(long, default_value = "0.5")]
        dbscan_eps: f64,

        /// DBSCAN minimum points per dense region
        #[arg(long, default_value = "5")]
        dbscan_min_points: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rfmseg=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Summary { input }) => run_summary(&input),

        Some(Commands::Rfm { input }) => run_rfm(&input, &AnalysisConfig::default()),

        Some(Commands::Cluster {
            input,
            method,
            seed,
            clusters,
            dbscan_eps,
            dbscan_min_points,
        }) => {
            let method: ClusterMethod = method.parse()?;
            let config = AnalysisConfig {
                clustering: ClusteringConfig {
                    seed,
                    hierarchical_clusters: clusters,
                    dbscan_eps,
                    dbscan_min_points,
                    ..ClusteringConfig::default()
                },
                ..AnalysisConfig::default()
            };
            run_cluster(&input, method, &config)
        }

        None => {
            eprintln!("No subcommand provided. Use 'rfmseg summary', 'rfmseg rfm' or 'rfmseg cluster'.");
            eprintln!("Run 'rfmseg --help' for usage information.");
            std::process::exit(1);
        }
    }
}

/// Validate the input path, prepare the output directory and load the table
fn load_input(input: &InputArgs) -> Result<CsvData> {
    if !input.csv.exists() {
        return Err(RfmError::Config(format!(
            "CSV file not found: {}",
            input.csv.display()
        )));
    }

    std::fs::create_dir_all(&input.output_dir)?;

    tracing::info!(path = %input.csv.display(), "loading transactions");
    let csv_data = CsvData::from_file(&input.csv, input.tsv)?;
    tracing::info!(
        rows = csv_data.row_count(),
        columns = csv_data.col_count(),
        "loaded table"
    );
    Ok(csv_data)
}

fn report_written(output_dir: &Path, files: &[&str]) {
    eprintln!("Output written to {}", output_dir.display());
    for file in files {
        eprintln!("  - {file}");
    }
}

fn run_summary(input: &InputArgs) -> Result<()> {
    let csv_data = load_input(input)?;
    let summary = DatasetSummary::from_csv(&csv_data)?;

    output::write_json(&input.output_dir, "dataset.json", &summary)?;
    output::write_summary(&input.output_dir, &output::dataset_summary_text(&summary))?;

    report_written(&input.output_dir, &["dataset.json", "summary.txt"]);
    Ok(())
}

fn run_rfm(input: &InputArgs, config: &AnalysisConfig) -> Result<()> {
    let csv_data = load_input(input)?;
    let analysis = pipeline::run_rfm(&csv_data, config)?;
    let record = RfmRecord::from(&analysis.segmentation);

    output::write_json(&input.output_dir, "rfm.json", &record)?;
    output::write_segments(&input.output_dir, &analysis.table, &analysis.segmentation)?;
    output::write_summary(&input.output_dir, &output::rfm_summary_text(&record))?;

    report_written(&input.output_dir, &["rfm.json", "segments.csv", "summary.txt"]);
    Ok(())
}

fn run_cluster(input: &InputArgs, method: ClusterMethod, config: &AnalysisConfig) -> Result<()> {
    let csv_data = load_input(input)?;
    let analysis = pipeline::run_clustering(&csv_data, method, config)?;
    let record = ClusteringRecord::from(&analysis.outcome);

    output::write_json(&input.output_dir, "clustering.json", &record)?;
    output::write_summary(&input.output_dir, &output::clustering_summary_text(&record))?;

    let mut files = vec!["clustering.json", "summary.txt"];
    if let ClusteringOutcome::Clustered(model) = &analysis.outcome {
        output::write_clusters(&input.output_dir, model)?;
        files.push("clusters.csv");
    }

    report_written(&input.output_dir, &files);
    Ok(())
}
