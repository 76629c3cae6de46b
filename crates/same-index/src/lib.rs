//! Incremental indexing pipeline: walk the vault, hash and chunk changed
//! notes, embed and persist them, then extract graph references — all from
//! one `Indexer` entry point shared by the CLI and any future daemon.

pub mod context;
pub mod error;
pub mod indexer;
pub mod progress;
pub mod scanner;
pub mod stats;

pub use context::{CancelToken, GlobalState};
pub use error::IndexError;
pub use indexer::{Indexer, IndexerConfig};
pub use progress::{NoopProgress, ProgressEvent, ProgressSink};
pub use stats::ReindexStats;
