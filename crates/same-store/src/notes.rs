//! Chunk-level note CRUD. One row per `(path, chunk_id)`.

use crate::error::StoreError;
use crate::pool::Store;
use rusqlite::{params, OptionalExtension, Row};
use same_core::model::{Note, PROVENANCE_HEADER_PREFIX};
use std::path::Path;

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    let tags_json: String = row.get("tags")?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    Ok(Note {
        path: row.get("path")?,
        chunk_id: row.get("chunk_id")?,
        title: row.get("title")?,
        agent: row.get("agent")?,
        domain: row.get("domain")?,
        workstream: row.get("workstream")?,
        tags,
        content_type: row.get("content_type")?,
        review_by: row.get("review_by")?,
        modified: row.get("modified")?,
        content_hash: row.get("content_hash")?,
        confidence: row.get("confidence")?,
        chunk_heading: row.get("chunk_heading")?,
        text: row.get("text")?,
    })
}

/// Insert or replace a single chunk row. Returns the row's internal rowid
/// (used as `graph_nodes.note_id` and `vectors.note_id`).
pub fn upsert_chunk(store: &Store, note: &Note) -> Result<i64, StoreError> {
    let tags_json = serde_json::to_string(&note.tags)?;
    store.with_connection_mut(|conn| {
        conn.execute(
            "INSERT INTO notes
                (path, chunk_id, title, agent, domain, workstream, tags, content_type,
                 review_by, modified, content_hash, confidence, chunk_heading, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(path, chunk_id) DO UPDATE SET
                title = excluded.title,
                agent = excluded.agent,
                domain = excluded.domain,
                workstream = excluded.workstream,
                tags = excluded.tags,
                content_type = excluded.content_type,
                review_by = excluded.review_by,
                modified = excluded.modified,
                content_hash = excluded.content_hash,
                confidence = excluded.confidence,
                chunk_heading = excluded.chunk_heading,
                text = excluded.text",
            params![
                note.path,
                note.chunk_id,
                note.title,
                note.agent,
                note.domain,
                note.workstream,
                tags_json,
                note.content_type,
                note.review_by,
                note.modified,
                note.content_hash,
                note.confidence,
                note.chunk_heading,
                note.text,
            ],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM notes WHERE path = ?1 AND chunk_id = ?2",
            params![note.path, note.chunk_id],
            |row| row.get(0),
        )?;
        Ok(id)
    })
}

/// Delete every chunk (and, via cascade, every vector and graph-node
/// reference) belonging to `path`. Used both by reindex-on-change and by
/// deletion of a vault file.
pub fn delete_file(store: &Store, path: &str) -> Result<usize, StoreError> {
    store.with_connection_mut(|conn| {
        Ok(conn.execute("DELETE FROM notes WHERE path = ?1", params![path])?)
    })
}

pub fn get_chunks_for_file(store: &Store, path: &str) -> Result<Vec<Note>, StoreError> {
    store.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM notes WHERE path = ?1 ORDER BY chunk_id ASC",
        )?;
        let rows = stmt
            .query_map(params![path], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn get_chunk(store: &Store, path: &str, chunk_id: i64) -> Result<Option<Note>, StoreError> {
    store.with_connection(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM notes WHERE path = ?1 AND chunk_id = ?2",
                params![path, chunk_id],
                row_to_note,
            )
            .optional()?)
    })
}

/// The `notes.id` rowid for `(path, chunk_id)`, the join key `same-search`
/// needs to look up a chunk's stored vector.
pub fn get_row_id(store: &Store, path: &str, chunk_id: i64) -> Result<Option<i64>, StoreError> {
    store.with_connection(|conn| {
        Ok(conn
            .query_row(
                "SELECT id FROM notes WHERE path = ?1 AND chunk_id = ?2",
                params![path, chunk_id],
                |row| row.get(0),
            )
            .optional()?)
    })
}

/// Existing `(modified, content_hash)` for a path, read once per file at the
/// start of a reindex to decide whether re-chunking is necessary. Compares
/// only chunk 0, since all chunks of one file share the same content hash
/// basis (computed over the whole body).
pub fn get_file_fingerprint(store: &Store, path: &str) -> Result<Option<(f64, String)>, StoreError> {
    store.with_connection(|conn| {
        Ok(conn
            .query_row(
                "SELECT modified, content_hash FROM notes WHERE path = ?1 AND chunk_id = 0",
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?)
    })
}

pub fn list_distinct_paths(store: &Store) -> Result<Vec<String>, StoreError> {
    store.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT DISTINCT path FROM notes ORDER BY path ASC")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// The `limit` most recently modified distinct notes, each represented by
/// its chunk 0 row.
pub fn list_recent(store: &Store, limit: usize) -> Result<Vec<Note>, StoreError> {
    store.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM notes WHERE chunk_id = 0 ORDER BY modified DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Write a note back to the vault filesystem with the provenance header
/// prepended, unless it is already present. `path` must already have passed
/// `PathGuard::resolve`; this function does no path validation of its own.
pub fn write_note_file(path: &Path, content: &str) -> std::io::Result<()> {
    let body = if content.starts_with(PROVENANCE_HEADER_PREFIX) {
        content.to_string()
    } else {
        format!("{PROVENANCE_HEADER_PREFIX} -->\n{content}")
    };
    std::fs::write(path, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note(path: &str, chunk_id: i64) -> Note {
        Note {
            path: path.to_string(),
            chunk_id,
            title: Some("Title".to_string()),
            agent: None,
            domain: None,
            workstream: None,
            tags: vec!["a".to_string(), "b".to_string()],
            content_type: None,
            review_by: None,
            modified: 1000.0,
            content_hash: "hash1".to_string(),
            confidence: 1.0,
            chunk_heading: Some("(full)".to_string()),
            text: "hello world".to_string(),
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let store = Store::memory().unwrap();
        upsert_chunk(&store, &sample_note("a.md", 0)).unwrap();
        let fetched = get_chunk(&store, "a.md", 0).unwrap().unwrap();
        assert_eq!(fetched.title.as_deref(), Some("Title"));
        assert_eq!(fetched.tags, vec!["a", "b"]);
    }

    #[test]
    fn upsert_is_idempotent_on_conflict() {
        let store = Store::memory().unwrap();
        upsert_chunk(&store, &sample_note("a.md", 0)).unwrap();
        let mut updated = sample_note("a.md", 0);
        updated.title = Some("New Title".to_string());
        upsert_chunk(&store, &updated).unwrap();

        let all = get_chunks_for_file(&store, "a.md").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title.as_deref(), Some("New Title"));
    }

    #[test]
    fn delete_file_removes_all_its_chunks() {
        let store = Store::memory().unwrap();
        upsert_chunk(&store, &sample_note("a.md", 0)).unwrap();
        upsert_chunk(&store, &sample_note("a.md", 1)).unwrap();
        let deleted = delete_file(&store, "a.md").unwrap();
        assert_eq!(deleted, 2);
        assert!(get_chunks_for_file(&store, "a.md").unwrap().is_empty());
    }

    #[test]
    fn fingerprint_reflects_chunk_zero_only() {
        let store = Store::memory().unwrap();
        upsert_chunk(&store, &sample_note("a.md", 0)).unwrap();
        let (modified, hash) = get_file_fingerprint(&store, "a.md").unwrap().unwrap();
        assert_eq!(modified, 1000.0);
        assert_eq!(hash, "hash1");
    }

    #[test]
    fn write_note_file_prepends_provenance_header_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("note.md");
        write_note_file(&path, "Body text").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(PROVENANCE_HEADER_PREFIX));

        write_note_file(&path, &written).unwrap();
        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert_eq!(rewritten.matches(PROVENANCE_HEADER_PREFIX).count(), 1);
    }
}
