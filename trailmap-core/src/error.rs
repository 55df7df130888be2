use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Cannot canonicalize '{url}': {reason}")]
    Canonicalization { url: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Crawl error: {0}")]
    Crawl(#[from] trailmap_scanner::ScanError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
