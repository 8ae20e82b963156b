use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Library load error: {0}")]
    LibraryLoad(String),

    #[error("Missing multimodal support: {0}")]
    MissingVisionSupport(String),

    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    #[error("Model construction failed: {0}")]
    Construction(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Artifact resolution failed: {0}")]
    Artifact(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
