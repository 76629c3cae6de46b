use same_core::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("store error: {0}")]
    Store(#[from] same_store::StoreError),

    #[error("unknown traversal direction: {0}")]
    UnknownDirection(String),

    #[error("start node {0} not found")]
    StartNodeNotFound(i64),

    #[error("llm extraction failed: {0}")]
    LlmFailure(String),

    #[error("llm response was not valid extraction JSON: {0}")]
    LlmMalformedResponse(String),
}

impl Classify for GraphError {
    fn kind(&self) -> ErrorKind {
        match self {
            GraphError::Store(e) => e.kind(),
            GraphError::UnknownDirection(_) => ErrorKind::InputValidation,
            GraphError::StartNodeNotFound(_) => ErrorKind::NotFound,
            GraphError::LlmFailure(_) => ErrorKind::EmbeddingBackend,
            GraphError::LlmMalformedResponse(_) => ErrorKind::SanitizeThenReport,
        }
    }
}
