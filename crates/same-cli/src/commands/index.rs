use same_config::VaultConfig;
use same_index::{CancelToken, GlobalState, Indexer, IndexerConfig, NoopProgress};
use same_parser::chunker::ChunkConfig;

use crate::app;

pub async fn execute(config: VaultConfig, force: bool, lite: bool) -> anyhow::Result<()> {
    let vault_root = config.canonical_vault_root()?;
    let store = app::open_store(&config)?;
    let embedder = if lite { None } else { Some(app::build_embedder(&config)?) };
    let extractor = app::build_extractor();

    let index_config = IndexerConfig {
        worker_count: config.index.worker_count,
        skip_dirs: config.index.skip_dirs.clone(),
        filename_denylist: Vec::new(),
        chunk: ChunkConfig {
            single_threshold_chars: config.index.chunk_single_threshold_chars,
            embed_cap_chars: config.index.embed_size_cap_chars,
        },
        claim_prune_after_days: 90,
    };

    let indexer = Indexer::new(
        store,
        vault_root,
        app::stats_path(&config),
        index_config,
        embedder,
        extractor,
    );

    let global = GlobalState::new();
    let cancel = CancelToken::new();

    let stats = if lite {
        indexer.reindex_lite(force, &global, &NoopProgress, &cancel).await?
    } else {
        indexer.reindex(force, &global, &NoopProgress, &cancel).await?
    };

    println!("indexed {} notes ({} new, {} skipped, {} deleted, {} failed)",
        stats.total_notes, stats.newly_indexed, stats.skipped_unchanged, stats.deleted, stats.failed);
    if !stats.warnings.is_empty() {
        println!("{} warnings:", stats.warnings.len());
        for warning in &stats.warnings {
            println!("  {warning}");
        }
    }
    Ok(())
}
