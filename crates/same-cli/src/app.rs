//! Wiring shared by every subcommand: open the store, build the configured
//! embedding provider, construct the graph extractor.

use std::path::PathBuf;
use std::sync::Arc;

use same_config::{EmbeddingProviderType, VaultConfig};
use same_embed::local::LocalEmbeddingProvider;
use same_embed::openai_compatible::{OpenAiCompatibleProvider, ProxyAttribution};
use same_embed::EmbeddingProvider;
use same_graph::GraphExtractor;
use same_store::Store;

/// Ollama's `nomic-embed-text` and most local models default to this width;
/// there is no per-provider dimension negotiation, so this is the value new
/// vaults are indexed with unless a different model is configured.
const DEFAULT_EMBED_DIMENSIONS: usize = 768;

pub fn open_store(config: &VaultConfig) -> anyhow::Result<Arc<Store>> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(Store::open(&db_path)?))
}

pub fn build_embedder(config: &VaultConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let model = config
        .embedding
        .model
        .clone()
        .unwrap_or_else(|| "nomic-embed-text".to_string());

    let provider: Arc<dyn EmbeddingProvider> = match config.embedding.provider {
        EmbeddingProviderType::Local => Arc::new(LocalEmbeddingProvider::new(
            config.embedding.api_url.clone(),
            model,
            DEFAULT_EMBED_DIMENSIONS,
        )?),
        EmbeddingProviderType::OpenAi => Arc::new(OpenAiCompatibleProvider::new(
            config.embedding.api_url.clone(),
            config.embedding.api_key.clone(),
            model,
            DEFAULT_EMBED_DIMENSIONS,
            ProxyAttribution::default(),
        )),
    };
    Ok(provider)
}

pub fn build_extractor() -> Arc<GraphExtractor> {
    Arc::new(GraphExtractor::new())
}

pub fn stats_path(config: &VaultConfig) -> PathBuf {
    config.index_stats_path()
}
