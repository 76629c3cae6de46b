//! Optional LLM-assisted graph extraction. Disabled by default; a vault
//! configures a concrete [`LlmExtractionClient`] to turn it on.

use crate::error::GraphError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmExtraction {
    #[serde(default)]
    pub nodes: Vec<LlmNode>,
    #[serde(default)]
    pub edges: Vec<LlmEdge>,
}

/// Sends note content to an LLM and asks for `{nodes, edges}` back. The
/// extractor treats JSON parse failure as a hard error; a quiet backend
/// failure should surface as [`GraphError::LlmFailure`] instead of an
/// empty extraction, so the caller can decide whether to skip the note.
#[async_trait]
pub trait LlmExtractionClient: Send + Sync {
    async fn extract(&self, content: &str) -> Result<LlmExtraction, GraphError>;
}

/// Used when no LLM is configured. `GraphExtractor` skips step 5 entirely
/// when this is the active client, so no network call is ever attempted.
pub struct NoopLlmClient;

#[async_trait]
impl LlmExtractionClient for NoopLlmClient {
    async fn extract(&self, _content: &str) -> Result<LlmExtraction, GraphError> {
        Ok(LlmExtraction::default())
    }
}

pub fn parse_llm_response(raw: &str) -> Result<LlmExtraction, GraphError> {
    serde_json::from_str(raw).map_err(|e| GraphError::LlmMalformedResponse(e.to_string()))
}
