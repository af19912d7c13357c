use sifter_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// Why writing an output file failed
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Failed to write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: OutputError,
    },

    #[error("Failed to load strategy table {}: {reason}", .path.display())]
    Strategy { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, RunError>;
