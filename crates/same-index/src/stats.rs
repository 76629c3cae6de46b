use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Result of one `reindex`/`reindex_lite` run, and the shape persisted to
/// `<vault>/.same/data/index_stats.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReindexStats {
    /// Files written this run, whether brand new or content-changed — the
    /// pipeline doesn't distinguish the two once a file is queued for work.
    pub newly_indexed: usize,
    pub skipped_unchanged: usize,
    pub deleted: usize,
    pub failed: usize,
    pub warnings: Vec<String>,
    pub total_notes: usize,
    pub embed_provider: Option<String>,
    pub embed_model: Option<String>,
    pub embed_dim: Option<usize>,
    pub index_mode: String,
    pub last_reindex_time: f64,
}

pub fn write_stats(path: &Path, stats: &ReindexStats) -> Result<(), IndexError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(stats).map_err(|e| {
        IndexError::Store(same_store::StoreError::Serde(e))
    })?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_stats(path: &Path) -> Option<ReindexStats> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}
