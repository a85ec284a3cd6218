pub mod anova;
pub mod clustering;
pub mod features;
pub mod hierarchical;
pub mod metrics;
pub mod output;
pub mod overview;
pub mod pipeline;
pub mod quality;
pub mod scoring;
pub mod segmentation;
pub mod stats;
pub mod taxonomy;
