//! Ranked retrieval over a single vault store, plus federated search across
//! several. Three fallback tiers — hybrid vector+FTS, FTS5 alone, `LIKE`
//! match density — so a query always returns something as long as any tier
//! can read the store.

pub mod error;
pub mod federated;
pub mod scoring;
pub mod searcher;
pub mod types;

pub use error::SearchError;
pub use federated::FederatedSearch;
pub use searcher::Searcher;
pub use types::{SearchHit, SearchOptions, MAX_TOP_K};
