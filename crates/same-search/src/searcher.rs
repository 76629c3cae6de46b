//! `Searcher`: the single in-process query path. Three tiers, tried in
//! descending order of quality, falling through on any provider failure
//! rather than surfacing an error — the caller always gets ranked results,
//! or a genuinely empty vault/query.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use same_core::PathGuard;
use same_embed::{EmbeddingProvider, Purpose};
use same_store::pool::Store;
use same_store::{fts, notes, vectors};

use crate::error::SearchError;
use crate::scoring::{dedup_best_per_note, match_density, normalize, HYBRID_ALPHA, LIKE_FALLBACK_FLOOR};
use crate::types::{SearchHit, SearchOptions, MAX_TOP_K};

const SNIPPET_MAX_CHARS: usize = 500;

pub struct Searcher {
    store: Arc<Store>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl Searcher {
    pub fn new(store: Arc<Store>, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self { store, embedder }
    }

    pub async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let top_k = opts.clamped_top_k();
        let candidate_n = (top_k * 3).max(30);

        // Each tier falls through to the next — on a hard error, or simply
        // because it found nothing — so a query only comes back empty once
        // the last (LIKE) tier has also found nothing.
        let scored = if self.hybrid_available()? {
            match self.try_hybrid(query, candidate_n).await {
                Ok(hits) if !hits.is_empty() => hits,
                Ok(_) => self.fts_then_like(query, candidate_n)?,
                Err(err) => {
                    tracing::warn!(error = %err, "hybrid search failed, falling back to FTS");
                    self.fts_then_like(query, candidate_n)?
                }
            }
        } else {
            self.fts_then_like(query, candidate_n)?
        };

        self.finish(scored, opts, top_k)
    }

    /// Chunk-0 embedding of `note_path` against every other stored vector,
    /// excluding the source note and anything under a private path.
    pub async fn find_similar(
        &self,
        note_path: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let top_k = top_k.clamp(1, MAX_TOP_K);
        let note_id = notes::get_row_id(&self.store, note_path, 0)?
            .ok_or_else(|| SearchError::NotFound(note_path.to_string()))?;
        let query_vector = vectors::get(&self.store, note_id)?
            .ok_or_else(|| SearchError::NotFound(note_path.to_string()))?;

        let hits = vectors::search(&self.store, &query_vector, top_k + 10)?;
        let mut results = Vec::new();
        for hit in hits {
            if hit.path == note_path {
                continue;
            }
            if PathGuard::is_private(&hit.path) {
                continue;
            }
            let Some(note) = notes::get_chunk(&self.store, &hit.path, hit.chunk_id)? else {
                continue;
            };
            results.push(SearchHit {
                path: note.path,
                chunk_id: note.chunk_id,
                title: note.title,
                snippet: build_snippet(&note.text),
                score: hit.score,
                modified: note.modified,
            });
            if results.len() == top_k {
                break;
            }
        }
        Ok(results)
    }

    fn hybrid_available(&self) -> Result<bool, SearchError> {
        if self.embedder.is_none() {
            return Ok(false);
        }
        Ok(!vectors::all_dimensions(&self.store)?.is_empty())
    }

    async fn try_hybrid(
        &self,
        query: &str,
        candidate_n: usize,
    ) -> Result<Vec<((String, i64), f32)>, SearchError> {
        let provider = self
            .embedder
            .as_ref()
            .expect("hybrid_available checked embedder is Some");
        let query_vector = provider.embed(query, Purpose::Query).await?;
        let vector_hits = vectors::search(&self.store, &query_vector, candidate_n)?;
        let fts_hits = fts::search_fts(&self.store, query, candidate_n)?;

        let mut vector_scores = HashMap::new();
        for hit in &vector_hits {
            vector_scores.insert((hit.path.clone(), hit.chunk_id), hit.score);
        }
        let mut bm25_scores = HashMap::new();
        for hit in &fts_hits {
            // bm25() is negative-is-better; negate so "higher is better" holds
            // for every score this module normalizes.
            bm25_scores.insert((hit.path.clone(), hit.chunk_id), -hit.bm25 as f32);
        }

        let vector_norm = normalize(&vector_scores);
        let bm25_norm = normalize(&bm25_scores);

        let mut keys: HashSet<(String, i64)> = vector_norm.keys().cloned().collect();
        keys.extend(bm25_norm.keys().cloned());

        let blended = keys
            .into_iter()
            .map(|key| {
                let v = vector_norm.get(&key).copied().unwrap_or(0.0);
                let b = bm25_norm.get(&key).copied().unwrap_or(0.0);
                let score = HYBRID_ALPHA * v + (1.0 - HYBRID_ALPHA) * b;
                (key, score)
            })
            .collect();

        Ok(dedup_best_per_note(blended))
    }

    fn fts_then_like(
        &self,
        query: &str,
        candidate_n: usize,
    ) -> Result<Vec<((String, i64), f32)>, SearchError> {
        match self.try_fts(query, candidate_n) {
            Ok(hits) if !hits.is_empty() => Ok(hits),
            Ok(_) => self.try_like(query, candidate_n),
            Err(err) => {
                tracing::warn!(error = %err, "FTS search failed, falling back to LIKE");
                self.try_like(query, candidate_n)
            }
        }
    }

    fn try_fts(
        &self,
        query: &str,
        candidate_n: usize,
    ) -> Result<Vec<((String, i64), f32)>, SearchError> {
        let hits = fts::search_fts(&self.store, query, candidate_n)?;
        let mut scores = HashMap::new();
        for hit in &hits {
            scores.insert((hit.path.clone(), hit.chunk_id), -hit.bm25 as f32);
        }
        let normalized = normalize(&scores).into_iter().collect();
        Ok(dedup_best_per_note(normalized))
    }

    /// Every query term must match (AND semantics), found by intersecting
    /// the per-term `LIKE` candidate sets, then ranked by match density.
    fn try_like(
        &self,
        query: &str,
        candidate_n: usize,
    ) -> Result<Vec<((String, i64), f32)>, SearchError> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut sets: Vec<HashSet<(String, i64)>> = Vec::with_capacity(terms.len());
        for term in &terms {
            let hits = fts::search_like_candidates(&self.store, term, candidate_n)?;
            sets.push(hits.into_iter().map(|h| (h.path, h.chunk_id)).collect());
        }
        let mut intersection = sets[0].clone();
        for set in &sets[1..] {
            intersection.retain(|key| set.contains(key));
        }

        let mut scored = Vec::new();
        for key in intersection {
            let Some(note) = notes::get_chunk(&self.store, &key.0, key.1)? else {
                continue;
            };
            let density = match_density(
                &terms,
                note.title.as_deref(),
                &note.text,
                &note.tags,
                note.chunk_heading.as_deref(),
            );
            let score = if density > 0.0 { density } else { LIKE_FALLBACK_FLOOR };
            scored.push((key, score));
        }
        Ok(scored)
    }

    fn finish(
        &self,
        scored: Vec<((String, i64), f32)>,
        opts: &SearchOptions,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let mut hits = Vec::with_capacity(scored.len());
        for ((path, chunk_id), score) in scored {
            if PathGuard::is_private(&path) {
                continue;
            }
            let Some(note) = notes::get_chunk(&self.store, &path, chunk_id)? else {
                continue;
            };
            if !passes_metadata_filter(&note, opts) {
                continue;
            }
            hits.push(SearchHit {
                path: note.path,
                chunk_id: note.chunk_id,
                title: note.title,
                snippet: build_snippet(&note.text),
                score,
                modified: note.modified,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.modified.partial_cmp(&a.modified).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.path.cmp(&b.path))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn passes_metadata_filter(note: &same_core::model::Note, opts: &SearchOptions) -> bool {
    if let Some(domain) = &opts.domain {
        if !note.domain.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(domain)) {
            return false;
        }
    }
    if let Some(workstream) = &opts.workstream {
        if !note
            .workstream
            .as_deref()
            .is_some_and(|w| w.eq_ignore_ascii_case(workstream))
        {
            return false;
        }
    }
    if let Some(agent) = &opts.agent {
        if !note.agent.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(agent)) {
            return false;
        }
    }
    if !opts.tags.is_empty() {
        let has_overlap = opts
            .tags
            .iter()
            .any(|wanted| note.tags.iter().any(|have| have.eq_ignore_ascii_case(wanted)));
        if !has_overlap {
            return false;
        }
    }
    true
}

fn build_snippet(text: &str) -> String {
    let truncated: String = text.chars().take(SNIPPET_MAX_CHARS).collect();
    same_core::sanitize::neutralize_tags(&truncated)
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|term| term.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use same_core::error::{EmbedErrorReason, ErrorKind};
    use same_core::model::{Note, Vector};
    use same_embed::EmbedError;

    struct DeterministicProvider;

    #[async_trait]
    impl EmbeddingProvider for DeterministicProvider {
        async fn embed(&self, text: &str, _purpose: Purpose) -> Result<Vector, EmbedError> {
            Ok(Vector(same_core::test_support::deterministic_embedding(text, 4)))
        }

        fn name(&self) -> &str {
            "deterministic"
        }

        fn model(&self) -> &str {
            "test"
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed(&self, _text: &str, _purpose: Purpose) -> Result<Vector, EmbedError> {
            Err(EmbedError::Backend {
                reason: EmbedErrorReason::NetworkError,
                message: "unreachable".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "test"
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    fn note(path: &str, title: &str, text: &str) -> Note {
        Note {
            path: path.to_string(),
            chunk_id: 0,
            title: Some(title.to_string()),
            agent: Some("agent-a".to_string()),
            domain: Some("backend".to_string()),
            workstream: None,
            tags: vec!["rust".to_string()],
            content_type: None,
            review_by: None,
            modified: 1000.0,
            content_hash: "h".to_string(),
            confidence: 0.8,
            chunk_heading: Some("(full)".to_string()),
            text: text.to_string(),
        }
    }

    fn seed(store: &Store, embed: bool) {
        let id_a = notes::upsert_chunk(store, &note("a.md", "Rust indexing", "deterministic chunking for rust notes")).unwrap();
        let id_b = notes::upsert_chunk(store, &note("b.md", "Unrelated", "completely different subject matter")).unwrap();
        if embed {
            vectors::put(store, id_a, &Vector(vec![1.0, 0.0, 0.0, 0.0])).unwrap();
            vectors::put(store, id_b, &Vector(vec![0.0, 1.0, 0.0, 0.0])).unwrap();
        }
    }

    #[tokio::test]
    async fn hybrid_search_ranks_matching_note_first() {
        let store = Arc::new(Store::memory().unwrap());
        seed(&store, true);
        let searcher = Searcher::new(store, Some(Arc::new(DeterministicProvider)));
        let hits = searcher
            .search("rust chunking", &SearchOptions::default())
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].path, "a.md");
    }

    #[tokio::test]
    async fn falls_through_to_fts_when_embedder_errors() {
        let store = Arc::new(Store::memory().unwrap());
        seed(&store, true);
        let searcher = Searcher::new(store, Some(Arc::new(FailingProvider)));
        let hits = searcher
            .search("rust", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(hits[0].path, "a.md");
    }

    #[tokio::test]
    async fn falls_through_to_like_when_no_embedder_and_fts_misses() {
        let store = Arc::new(Store::memory().unwrap());
        seed(&store, false);
        let searcher = Searcher::new(store, None);
        // FTS5 tokenizes on word boundaries; a substring-only term forces LIKE.
        let hits = searcher
            .search("etermin", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(hits[0].path, "a.md");
    }

    #[tokio::test]
    async fn private_paths_never_surface() {
        let store = Arc::new(Store::memory().unwrap());
        notes::upsert_chunk(&store, &note("_PRIVATE/secret.md", "Rust secret", "rust rust rust")).unwrap();
        notes::upsert_chunk(&store, &note("public.md", "Rust public", "rust rust rust")).unwrap();
        let searcher = Searcher::new(store, None);
        let hits = searcher
            .search("rust", &SearchOptions::default())
            .await
            .unwrap();
        assert!(hits.iter().all(|h| h.path != "_PRIVATE/secret.md"));
    }

    #[tokio::test]
    async fn metadata_filter_excludes_non_matching_domain() {
        let store = Arc::new(Store::memory().unwrap());
        seed(&store, false);
        let searcher = Searcher::new(store, None);
        let opts = SearchOptions {
            domain: Some("frontend".to_string()),
            ..Default::default()
        };
        let hits = searcher.search("rust", &opts).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn find_similar_excludes_the_source_note() {
        let store = Arc::new(Store::memory().unwrap());
        seed(&store, true);
        let searcher = Searcher::new(store, None);
        let hits = searcher.find_similar("a.md", 5).await.unwrap();
        assert!(hits.iter().all(|h| h.path != "a.md"));
    }
}
