use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};

use same_core::model::{meta_keys, IndexMode, Note, NoteMetadata, Vector, CHUNK_TEXT_MAX_CHARS};
use same_core::PathGuard;
use same_embed::{EmbeddingProvider, Purpose};
use same_graph::extractor::{ExtractionInput, GraphExtractor};
use same_parser::chunker::{chunk_body, ChunkConfig};
use same_parser::frontmatter::parse_frontmatter;
use same_store::pool::Store;

use crate::context::{CancelToken, GlobalState};
use crate::error::IndexError;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::scanner::{walk_markdown_files, LARGE_FILE_WARN_BYTES};
use crate::stats::{read_stats, write_stats, ReindexStats};

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub worker_count: usize,
    pub skip_dirs: Vec<String>,
    pub filename_denylist: Vec<String>,
    pub chunk: ChunkConfig,
    /// Claims whose `expires_at` is older than this many days are pruned at
    /// the end of each reindex. Claims are the only "usage" data same-store
    /// tracks, so this is what stands in for the aging policy.
    pub claim_prune_after_days: i64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            skip_dirs: vec![".git".to_string(), ".same".to_string(), ".obsidian".to_string()],
            filename_denylist: Vec::new(),
            chunk: ChunkConfig::default(),
            claim_prune_after_days: 90,
        }
    }
}

enum FileOutcome {
    Indexed {
        path: String,
        agent: Option<String>,
        content: String,
        records: Vec<(Note, Option<Vector>)>,
        warnings: Vec<String>,
    },
    Failed {
        path: String,
        message: String,
    },
}

/// Orchestrates walk → hash → chunk → embed → persist → graph-extract over
/// a vault. Workers (spawned per `run`) only parse, chunk, and embed; the
/// collector loop that follows them is the sole writer to `store`.
pub struct Indexer {
    store: Arc<Store>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    extractor: Arc<GraphExtractor>,
    vault_root: PathBuf,
    stats_path: PathBuf,
    config: IndexerConfig,
    path_guard: PathGuard,
}

impl Indexer {
    pub fn new(
        store: Arc<Store>,
        vault_root: PathBuf,
        stats_path: PathBuf,
        config: IndexerConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        extractor: Arc<GraphExtractor>,
    ) -> Self {
        let path_guard = PathGuard::new(vault_root.clone());
        Self {
            store,
            embedder,
            extractor,
            vault_root,
            stats_path,
            config,
            path_guard,
        }
    }

    pub async fn reindex(
        &self,
        force: bool,
        global: &GlobalState,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<ReindexStats, IndexError> {
        self.run(force, IndexMode::Full, global, progress, cancel).await
    }

    /// Keyword-only reindex: chunks and persists text without ever calling
    /// the embedding provider, regardless of whether one is configured.
    pub async fn reindex_lite(
        &self,
        force: bool,
        global: &GlobalState,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<ReindexStats, IndexError> {
        self.run(force, IndexMode::Lite, global, progress, cancel).await
    }

    pub async fn index_single_file(
        &self,
        rel_path: &str,
        global: &GlobalState,
    ) -> Result<(), IndexError> {
        self.index_one(rel_path, IndexMode::Full, global).await
    }

    pub async fn index_single_file_lite(
        &self,
        rel_path: &str,
        global: &GlobalState,
    ) -> Result<(), IndexError> {
        self.index_one(rel_path, IndexMode::Lite, global).await
    }

    pub fn get_stats(&self) -> ReindexStats {
        read_stats(&self.stats_path).unwrap_or_default()
    }

    async fn index_one(
        &self,
        rel_path: &str,
        mode: IndexMode,
        global: &GlobalState,
    ) -> Result<(), IndexError> {
        if !global.try_record_write(Instant::now()) {
            return Err(IndexError::WriteRateLimitExceeded);
        }
        let abs_path = self.path_guard.resolve(rel_path)?;
        let now = now_secs();
        let outcome = process_file(
            rel_path.to_string(),
            abs_path,
            self.config.chunk.clone(),
            self.embedder.clone(),
            mode,
        )
        .await;

        match outcome {
            FileOutcome::Indexed {
                path,
                agent,
                content,
                records,
                ..
            } => {
                same_store::notes::delete_file(&self.store, &path)?;
                let mut first_id = None;
                for (note, vector) in records {
                    let id = same_store::notes::upsert_chunk(&self.store, &note)?;
                    if note.chunk_id == 0 {
                        first_id = Some(id);
                    }
                    if let Some(vector) = vector {
                        same_store::vectors::put(&self.store, id, &vector)?;
                    }
                }
                if let Some(note_id) = first_id {
                    let input = ExtractionInput {
                        note_id,
                        note_path: &path,
                        content: &content,
                        agent: agent.as_deref(),
                    };
                    self.extractor.extract(&self.store, &input, now).await?;
                }
                Ok(())
            }
            FileOutcome::Failed { path, message } => {
                Err(IndexError::NoEmbeddingsForFile(format!("{path}: {message}")))
            }
        }
    }

    async fn run(
        &self,
        force: bool,
        mode: IndexMode,
        global: &GlobalState,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<ReindexStats, IndexError> {
        global.try_begin_reindex(Instant::now())?;

        let now = now_secs();
        let mut stats = ReindexStats::default();

        let existing_paths = same_store::notes::list_distinct_paths(&self.store)?;

        if force {
            for path in &existing_paths {
                same_store::notes::delete_file(&self.store, path)?;
            }
        }

        let disk_paths = walk_markdown_files(
            &self.vault_root,
            &self.config.skip_dirs,
            &self.config.filename_denylist,
        );
        let disk_set: HashSet<&String> = disk_paths.iter().collect();

        if !force {
            for path in &existing_paths {
                if !disk_set.contains(path) {
                    same_store::notes::delete_file(&self.store, path)?;
                    stats.deleted += 1;
                }
            }
        }

        let mut work_items = Vec::new();
        for rel_path in &disk_paths {
            let abs_path = self.vault_root.join(rel_path);
            if !force {
                if let Some((_, existing_hash)) =
                    same_store::notes::get_file_fingerprint(&self.store, rel_path)?
                {
                    match std::fs::read_to_string(&abs_path) {
                        Ok(content) => {
                            let parsed = parse_frontmatter(&content);
                            let body_hash = hex::encode(Sha256::digest(parsed.body.as_bytes()));
                            if body_hash == existing_hash {
                                stats.skipped_unchanged += 1;
                                progress.on_event(ProgressEvent::FileSkippedUnchanged {
                                    path: rel_path.clone(),
                                });
                                continue;
                            }
                        }
                        Err(e) => {
                            let message = format!("{rel_path}: read error: {e}");
                            stats.warnings.push(message.clone());
                            progress.on_event(ProgressEvent::Warning { message });
                            continue;
                        }
                    }
                }
            }
            progress.on_event(ProgressEvent::FileStarted {
                path: rel_path.clone(),
            });
            work_items.push((rel_path.clone(), abs_path));
        }

        let worker_count = self.config.worker_count.max(1);
        let (tx, mut rx) = tokio::sync::mpsc::channel::<FileOutcome>(worker_count * 2);

        let mut handles = Vec::new();
        for shard_items in shard(work_items, worker_count) {
            let tx = tx.clone();
            let chunk_config = self.config.chunk.clone();
            let embedder = self.embedder.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                for (rel_path, abs_path) in shard_items {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let outcome = process_file(
                        rel_path,
                        abs_path,
                        chunk_config.clone(),
                        embedder.clone(),
                        mode,
                    )
                    .await;
                    if tx.send(outcome).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        let mut any_eligible = false;
        let mut all_failed = true;
        while let Some(outcome) = rx.recv().await {
            any_eligible = true;
            match outcome {
                FileOutcome::Indexed {
                    path,
                    agent,
                    content,
                    records,
                    warnings,
                } => {
                    all_failed = false;
                    same_store::notes::delete_file(&self.store, &path)?;
                    let mut first_id = None;
                    for (note, vector) in records {
                        let chunk_id = note.chunk_id;
                        let id = same_store::notes::upsert_chunk(&self.store, &note)?;
                        if chunk_id == 0 {
                            first_id = Some(id);
                        }
                        if let Some(vector) = vector {
                            same_store::vectors::put(&self.store, id, &vector)?;
                        }
                    }
                    if let Some(note_id) = first_id {
                        let input = ExtractionInput {
                            note_id,
                            note_path: &path,
                            content: &content,
                            agent: agent.as_deref(),
                        };
                        self.extractor.extract(&self.store, &input, now).await?;
                    }
                    for w in warnings {
                        stats.warnings.push(w.clone());
                        progress.on_event(ProgressEvent::Warning { message: w });
                    }
                    stats.newly_indexed += 1;
                    progress.on_event(ProgressEvent::FileIndexed { path });
                }
                FileOutcome::Failed { path, message } => {
                    stats.failed += 1;
                    let warning = format!("{path}: {message}");
                    stats.warnings.push(warning);
                    progress.on_event(ProgressEvent::FileFailed { path, message });
                }
            }
            if cancel.is_cancelled() {
                break;
            }
        }

        for handle in handles {
            let _ = handle.await;
        }

        if any_eligible && all_failed && mode == IndexMode::Full && self.embedder.is_some() {
            return Err(IndexError::EmbeddingBackendUnavailable);
        }

        if mode == IndexMode::Full {
            if let Some(embedder) = &self.embedder {
                same_store::meta::record_provider(
                    &self.store,
                    embedder.name(),
                    embedder.model(),
                    embedder.dimensions(),
                )?;
                stats.embed_provider = Some(embedder.name().to_string());
                stats.embed_model = Some(embedder.model().to_string());
                stats.embed_dim = Some(embedder.dimensions());
            }
        }
        same_store::meta::set(&self.store, meta_keys::INDEX_MODE, &mode.to_string())?;
        same_store::meta::set(&self.store, meta_keys::LAST_REINDEX_TIME, &now.to_string())?;

        // Triggers in `same-store::schema` keep the FTS shadow synchronized on
        // every write; this rebuild is the once-per-run integrity check, not
        // something later reads depend on.
        same_store::fts::rebuild(&self.store)?;

        let prune_before = now - (self.config.claim_prune_after_days as f64 * 86_400.0);
        same_store::claims::sweep_expired(&self.store, prune_before)?;

        stats.total_notes = same_store::notes::list_distinct_paths(&self.store)?.len();
        stats.index_mode = mode.to_string();
        stats.last_reindex_time = now;

        write_stats(&self.stats_path, &stats)?;

        Ok(stats)
    }
}

async fn process_file(
    rel_path: String,
    abs_path: PathBuf,
    chunk_config: ChunkConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    mode: IndexMode,
) -> FileOutcome {
    let content = match std::fs::read_to_string(&abs_path) {
        Ok(c) => c,
        Err(e) => {
            return FileOutcome::Failed {
                path: rel_path,
                message: format!("read error: {e}"),
            }
        }
    };

    let mut warnings = Vec::new();
    if content.len() as u64 > LARGE_FILE_WARN_BYTES {
        warnings.push(format!(
            "{rel_path} exceeds {LARGE_FILE_WARN_BYTES} bytes, chunking may be aggressive"
        ));
    }

    let parsed = parse_frontmatter(&content);
    let body_hash = hex::encode(Sha256::digest(parsed.body.as_bytes()));
    let modified = abs_path
        .metadata()
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let pieces = chunk_body(&parsed.body, &chunk_config);
    let confidence = compute_confidence(&parsed.metadata);

    let mut records = Vec::with_capacity(pieces.len());
    let mut chunk_failures = 0usize;
    for (chunk_id, piece) in pieces.iter().enumerate() {
        let note = Note {
            path: rel_path.clone(),
            chunk_id: chunk_id as i64,
            title: parsed.metadata.title.clone(),
            agent: parsed.metadata.agent.clone(),
            domain: parsed.metadata.domain.clone(),
            workstream: parsed.metadata.workstream.clone(),
            tags: parsed.metadata.tags.clone(),
            content_type: parsed.metadata.content_type.clone(),
            review_by: parsed.metadata.review_by.clone(),
            modified,
            content_hash: body_hash.clone(),
            confidence,
            chunk_heading: piece.heading.clone(),
            text: truncate_chars(&piece.text, CHUNK_TEXT_MAX_CHARS),
        };

        let vector = if matches!(mode, IndexMode::Full) {
            if let Some(provider) = &embedder {
                let embed_text =
                    embed_input(&parsed.metadata.title, &piece.text, chunk_config.embed_cap_chars);
                match provider.embed(&embed_text, Purpose::Document).await {
                    Ok(v) => Some(v),
                    Err(e) => {
                        chunk_failures += 1;
                        warnings.push(format!("{rel_path}#{chunk_id}: embedding failed: {e}"));
                        None
                    }
                }
            } else {
                None
            }
        } else {
            None
        };

        records.push((note, vector));
    }

    let embedding_required = matches!(mode, IndexMode::Full) && embedder.is_some();
    if embedding_required && !records.is_empty() && chunk_failures == records.len() {
        return FileOutcome::Failed {
            path: rel_path,
            message: "no embeddings could be produced".to_string(),
        };
    }

    FileOutcome::Indexed {
        agent: parsed.metadata.agent.clone(),
        content: parsed.body,
        path: rel_path,
        records,
        warnings,
    }
}

/// `review_by` and an explicit `content_type` are both signals that a human
/// curated this note, so they raise confidence above the 0.7 baseline.
fn compute_confidence(metadata: &NoteMetadata) -> f32 {
    let mut confidence = 0.7_f32;
    if metadata.review_by.is_some() {
        confidence += 0.2;
    }
    if metadata.content_type.is_some() {
        confidence += 0.1;
    }
    confidence.clamp(0.0, 1.0)
}

fn embed_input(title: &Option<String>, text: &str, cap: usize) -> String {
    let combined = match title {
        Some(t) if !t.is_empty() => format!("{t}\n\n{text}"),
        _ => text.to_string(),
    };
    truncate_chars(&combined, cap)
}

fn truncate_chars(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        input.to_string()
    } else {
        input.chars().take(max).collect()
    }
}

fn shard<T>(items: Vec<T>, n: usize) -> Vec<Vec<T>> {
    let mut shards: Vec<Vec<T>> = (0..n).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        shards[i % n].push(item);
    }
    shards
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
