use same_config::VaultConfig;
use same_index::ReindexStats;

use crate::app;

pub async fn execute(config: VaultConfig) -> anyhow::Result<()> {
    let path = app::stats_path(&config);
    let stats = same_index::stats::read_stats(&path).unwrap_or_else(ReindexStats::default);

    println!("vault: {}", config.vault_path.display());
    println!("total notes:      {}", stats.total_notes);
    println!("last reindex:     {} new, {} skipped, {} deleted, {} failed",
        stats.newly_indexed, stats.skipped_unchanged, stats.deleted, stats.failed);
    println!("index mode:       {}", if stats.index_mode.is_empty() { "(never indexed)" } else { &stats.index_mode });
    if let Some(provider) = &stats.embed_provider {
        println!("embed provider:   {} ({})", provider, stats.embed_model.as_deref().unwrap_or("?"));
    }
    Ok(())
}
