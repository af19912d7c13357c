use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to load {url} after {attempts} attempt(s): {reason}")]
    Navigation {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// Whether this error should end the whole run rather than a single node or page
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::Navigation { .. } | ScanError::Browser(_) | ScanError::JoinError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
