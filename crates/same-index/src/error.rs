use same_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] same_store::StoreError),

    #[error(transparent)]
    Graph(#[from] same_graph::GraphError),

    #[error("path rejected: {0}")]
    PathRejected(#[from] same_core::path_guard::RejectReason),

    /// Every chunk in a file failed to embed.
    #[error("no embeddings could be produced for {0}")]
    NoEmbeddingsForFile(String),

    /// Every file eligible for (re)indexing in this run hit
    /// [`IndexError::NoEmbeddingsForFile`] — the backend itself is down,
    /// not just one bad file.
    #[error("embedding backend produced no usable embeddings for this run")]
    EmbeddingBackendUnavailable,

    #[error("reindex is on cooldown, retry in {retry_after_secs}s")]
    ReindexCooldownActive { retry_after_secs: u64 },

    #[error("write rate limit exceeded, slow down")]
    WriteRateLimitExceeded,
}

impl Classify for IndexError {
    fn kind(&self) -> ErrorKind {
        match self {
            IndexError::Io(_) => ErrorKind::Store,
            IndexError::Store(e) => e.kind(),
            IndexError::Graph(e) => e.kind(),
            IndexError::PathRejected(_) => ErrorKind::InputValidation,
            IndexError::NoEmbeddingsForFile(_) => ErrorKind::EmbeddingBackend,
            IndexError::EmbeddingBackendUnavailable => ErrorKind::EmbeddingBackend,
            IndexError::ReindexCooldownActive { .. } => ErrorKind::InputValidation,
            IndexError::WriteRateLimitExceeded => ErrorKind::InputValidation,
        }
    }
}
