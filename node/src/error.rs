use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image conversion failed: {0}")]
    Image(String),

    #[error("Engine error: {0}")]
    Engine(#[from] qwenvl_engine::EngineError),

    #[error("Model cache error: {0}")]
    ModelCache(#[from] qwenvl_model_cache::ModelCacheError),
}

pub type Result<T> = std::result::Result<T, NodeError>;
