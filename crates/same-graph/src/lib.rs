//! Knowledge-graph extraction (regex-driven, with an optional LLM helper)
//! and traversal (neighbors, recursive-CTE path queries, subgraphs, stats).

pub mod error;
pub mod extractor;
pub mod llm;
pub mod query;

pub use error::GraphError;
pub use extractor::{ExtractionInput, ExtractionSummary, GraphExtractor};
pub use llm::{LlmEdge, LlmExtraction, LlmExtractionClient, LlmNode, NoopLlmClient};
pub use query::{GraphQuery, GraphQueryOptions, GraphStats, PathResult, Subgraph};
