use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfmError {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data validation error: {0}")]
    DataValidation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unsupported clustering method: {0}")]
    Algorithm(String),

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RfmError>;
