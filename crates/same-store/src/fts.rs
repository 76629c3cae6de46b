//! FTS5-backed full-text search and the raw `LIKE` fallback candidate query.
//!
//! Ranking policy (bm25 normalization, match-density scoring) lives in
//! `same-search`; this module only runs SQL and hands back raw hits.

use crate::error::StoreError;
use crate::pool::Store;
use rusqlite::params;

#[derive(Debug, Clone)]
pub struct FtsHit {
    pub path: String,
    pub chunk_id: i64,
    /// SQLite's `bm25()` is negative-is-better; callers normalize.
    pub bm25: f64,
    pub title: Option<String>,
    pub text: String,
}

pub fn search_fts(store: &Store, query: &str, limit: usize) -> Result<Vec<FtsHit>, StoreError> {
    store.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT notes.path, notes.chunk_id, bm25(notes_fts) AS score, notes.title, notes.text
             FROM notes_fts
             JOIN notes ON notes.id = notes_fts.rowid
             WHERE notes_fts MATCH ?1
             ORDER BY score ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![query, limit as i64], |row| {
                Ok(FtsHit {
                    path: row.get(0)?,
                    chunk_id: row.get(1)?,
                    bm25: row.get(2)?,
                    title: row.get(3)?,
                    text: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>();
        match rows {
            Ok(hits) => Ok(hits),
            // Malformed FTS5 query syntax (unbalanced quotes, bare operators):
            // the last-resort tier handles this, so surface an empty result
            // here rather than propagating a query syntax error upward.
            Err(_) => Ok(Vec::new()),
        }
    })
}

#[derive(Debug, Clone)]
pub struct LikeCandidate {
    pub path: String,
    pub chunk_id: i64,
    pub title: Option<String>,
    pub text: String,
}

/// Every chunk whose title or text contains `term` case-insensitively, with
/// no ranking applied — `same-search` scores these by match density.
pub fn search_like_candidates(
    store: &Store,
    term: &str,
    limit: usize,
) -> Result<Vec<LikeCandidate>, StoreError> {
    let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));
    store.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT path, chunk_id, title, text FROM notes
             WHERE text LIKE ?1 ESCAPE '\\' OR title LIKE ?1 ESCAPE '\\'
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![pattern, limit as i64], |row| {
                Ok(LikeCandidate {
                    path: row.get(0)?,
                    chunk_id: row.get(1)?,
                    title: row.get(2)?,
                    text: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Force a full rebuild of the FTS5 shadow index from `notes`. The
/// insert/delete/update triggers in `schema` already keep it synchronized
/// on every write, so this is a belt-and-suspenders integrity operation the
/// indexer runs once per reindex rather than something the hot write path
/// depends on.
pub fn rebuild(store: &Store) -> Result<(), StoreError> {
    store.with_connection_mut(|conn| {
        conn.execute("INSERT INTO notes_fts(notes_fts) VALUES ('rebuild')", [])?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes;
    use same_core::model::Note;

    fn insert(store: &Store, path: &str, text: &str) {
        notes::upsert_chunk(
            store,
            &Note {
                path: path.to_string(),
                chunk_id: 0,
                title: Some("Title".to_string()),
                agent: None,
                domain: None,
                workstream: None,
                tags: vec![],
                content_type: None,
                review_by: None,
                modified: 0.0,
                content_hash: "h".to_string(),
                confidence: 1.0,
                chunk_heading: Some("(full)".to_string()),
                text: text.to_string(),
            },
        )
        .unwrap();
    }

    #[test]
    fn fts_search_finds_matching_text() {
        let store = Store::memory().unwrap();
        insert(&store, "a.md", "deterministic chunking for indexing");
        insert(&store, "b.md", "unrelated content");
        let hits = search_fts(&store, "chunking", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "a.md");
    }

    #[test]
    fn fts_search_on_malformed_query_returns_empty_not_error() {
        let store = Store::memory().unwrap();
        insert(&store, "a.md", "text");
        let hits = search_fts(&store, "\"unterminated", 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn like_candidates_are_case_insensitive() {
        let store = Store::memory().unwrap();
        insert(&store, "a.md", "Redis caching layer");
        let hits = search_like_candidates(&store, "redis", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
