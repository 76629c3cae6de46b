//! Cross-vault search: run the same [`Searcher`] chain against every vault
//! in an alias→path map and merge the results, skipping any vault that
//! can't be opened rather than failing the whole query.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use same_embed::EmbeddingProvider;
use same_store::pool::Store;

use crate::searcher::Searcher;
use crate::types::{SearchHit, SearchOptions};

pub struct FederatedSearch {
    vaults: HashMap<String, PathBuf>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    open: Mutex<HashMap<String, Arc<Store>>>,
}

impl FederatedSearch {
    pub fn new(vaults: HashMap<String, PathBuf>, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            vaults,
            embedder,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `query` against every configured vault and merges the hits,
    /// each tagged with the alias it came from, sorted by descending score.
    /// A vault whose store can't be opened is logged and skipped, never
    /// fails the call.
    pub async fn search_across(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Vec<(String, SearchHit)> {
        let top_k = opts.clamped_top_k();
        let mut merged = Vec::new();

        for (alias, store) in self.open_stores() {
            let searcher = Searcher::new(store, self.embedder.clone());
            match searcher.search(query, opts).await {
                Ok(hits) => merged.extend(hits.into_iter().map(|hit| (alias.clone(), hit))),
                Err(err) => {
                    tracing::warn!(vault = %alias, error = %err, "federated search failed for vault, skipping");
                }
            }
        }

        merged.sort_by(|(_, a), (_, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.modified.partial_cmp(&a.modified).unwrap_or(std::cmp::Ordering::Equal))
        });
        merged.truncate(top_k);
        merged
    }

    /// Opened, cached `Store` handles for every vault whose file currently
    /// exists on disk. A vault that was removed or never indexed is skipped
    /// silently rather than auto-created by [`Store::open`].
    fn open_stores(&self) -> Vec<(String, Arc<Store>)> {
        let mut cache = self.open.lock();
        let mut result = Vec::with_capacity(self.vaults.len());
        for (alias, path) in &self.vaults {
            if let Some(store) = cache.get(alias) {
                result.push((alias.clone(), store.clone()));
                continue;
            }
            if !path.exists() {
                tracing::warn!(vault = %alias, path = %path.display(), "vault store missing, skipping");
                continue;
            }
            match Store::open(path) {
                Ok(store) => {
                    let store = Arc::new(store);
                    cache.insert(alias.clone(), store.clone());
                    result.push((alias.clone(), store));
                }
                Err(err) => {
                    tracing::warn!(vault = %alias, error = %err, "failed to open vault store, skipping");
                }
            }
        }
        result
    }
}
