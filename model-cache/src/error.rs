use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelCacheError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    #[error("Invalid repository id: {0}")]
    InvalidRepo(String),

    #[error("Invalid artifact name: {0}")]
    InvalidArtifactName(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelCacheError>;
