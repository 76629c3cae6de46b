//! Vector storage and brute-force cosine search.
//!
//! There is no native vector index; for a single-user vault-sized corpus a
//! full scan over stored `f32` blobs is fast enough, and it keeps the store
//! a plain relational file with no extension dependency.

use crate::error::StoreError;
use crate::pool::Store;
use rusqlite::{params, OptionalExtension};
use same_core::model::Vector;

fn encode(vector: &Vector) -> Vec<u8> {
    vector.0.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode(bytes: &[u8]) -> Vector {
    Vector(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Store the vector for `note_id` (the `notes.id` rowid returned by
/// `notes::upsert_chunk`). Errors if the vector is invalid, mirroring the
/// invariant that every stored vector is non-empty and non-all-zero.
pub fn put(store: &Store, note_id: i64, vector: &Vector) -> Result<(), StoreError> {
    if !vector.is_valid() {
        return Err(StoreError::InvalidVector);
    }
    let bytes = encode(vector);
    store.with_connection_mut(|conn| {
        conn.execute(
            "INSERT INTO vectors (note_id, dim, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(note_id) DO UPDATE SET dim = excluded.dim, data = excluded.data",
            params![note_id, vector.dimensions() as i64, bytes],
        )?;
        Ok(())
    })
}

pub fn get(store: &Store, note_id: i64) -> Result<Option<Vector>, StoreError> {
    store.with_connection(|conn| {
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT data FROM vectors WHERE note_id = ?1",
                params![note_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bytes.map(|b| decode(&b)))
    })
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub path: String,
    pub chunk_id: i64,
    pub score: f32,
}

/// Brute-force cosine search over every stored vector, returning the top
/// `limit` scored `(path, chunk_id)` pairs, best first.
pub fn search(store: &Store, query: &Vector, limit: usize) -> Result<Vec<ScoredChunk>, StoreError> {
    store.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT notes.path, notes.chunk_id, vectors.data
             FROM vectors JOIN notes ON notes.id = vectors.note_id",
        )?;
        let mut scored: Vec<ScoredChunk> = stmt
            .query_map([], |row| {
                let path: String = row.get(0)?;
                let chunk_id: i64 = row.get(1)?;
                let bytes: Vec<u8> = row.get(2)?;
                Ok((path, chunk_id, bytes))
            })?
            .filter_map(|r| r.ok())
            .map(|(path, chunk_id, bytes)| {
                let stored = decode(&bytes);
                ScoredChunk {
                    path,
                    chunk_id,
                    score: query.cosine_similarity(&stored),
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    })
}

/// Every stored vector's `(path, chunk_id, dim)`, used by the integrity
/// check that compares `len(v) == meta.embed_dim` for every row.
pub fn all_dimensions(store: &Store) -> Result<Vec<(String, i64, i64)>, StoreError> {
    store.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT notes.path, notes.chunk_id, vectors.dim
             FROM vectors JOIN notes ON notes.id = vectors.note_id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes;
    use same_core::model::Note;

    fn insert_note(store: &Store, path: &str, chunk_id: i64) -> i64 {
        notes::upsert_chunk(
            store,
            &Note {
                path: path.to_string(),
                chunk_id,
                title: None,
                agent: None,
                domain: None,
                workstream: None,
                tags: vec![],
                content_type: None,
                review_by: None,
                modified: 0.0,
                content_hash: "h".to_string(),
                confidence: 1.0,
                chunk_heading: None,
                text: "t".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn put_then_get_round_trips_exactly() {
        let store = Store::memory().unwrap();
        let id = insert_note(&store, "a.md", 0);
        let vector = Vector(vec![0.1, 0.2, 0.3]);
        put(&store, id, &vector).unwrap();
        let fetched = get(&store, id).unwrap().unwrap();
        assert_eq!(fetched.0, vector.0);
    }

    #[test]
    fn put_rejects_all_zero_vector() {
        let store = Store::memory().unwrap();
        let id = insert_note(&store, "a.md", 0);
        let err = put(&store, id, &Vector(vec![0.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidVector));
    }

    #[test]
    fn search_ranks_closer_vectors_first() {
        let store = Store::memory().unwrap();
        let id_a = insert_note(&store, "a.md", 0);
        let id_b = insert_note(&store, "b.md", 0);
        put(&store, id_a, &Vector(vec![1.0, 0.0])).unwrap();
        put(&store, id_b, &Vector(vec![0.0, 1.0])).unwrap();

        let results = search(&store, &Vector(vec![1.0, 0.0]), 10).unwrap();
        assert_eq!(results[0].path, "a.md");
        assert!(results[0].score > results[1].score);
    }
}
