use same_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] same_store::StoreError),

    #[error(transparent)]
    Embed(#[from] same_embed::EmbedError),

    #[error("no such note: {0}")]
    NotFound(String),
}

impl Classify for SearchError {
    fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Store(e) => e.kind(),
            SearchError::Embed(e) => e.kind(),
            SearchError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}
