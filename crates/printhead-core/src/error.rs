#[derive(Debug, thiserror::Error)]
pub enum ColorantError {
    #[error("colorant name not recognised: {0}")]
    NameNotRecognized(String),
    #[error("colorant index {index} out of range (registry holds {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("colorant serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
