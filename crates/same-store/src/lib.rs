//! Embedded relational store: notes, chunks, vectors, metadata, pins,
//! claims, the knowledge-graph tables, and the FTS5 shadow index.

pub mod claims;
pub mod error;
pub mod fts;
pub mod graph;
pub mod meta;
pub mod notes;
pub mod pins;
pub mod pool;
pub mod schema;
pub mod vectors;

pub use error::StoreError;
pub use pool::Store;
