//! Table definitions and the one-shot migration applied on every open.
//!
//! There is a single schema version; this is not a migration framework, just
//! an idempotent `CREATE TABLE IF NOT EXISTS` batch plus the FTS5 shadow
//! table and its sync triggers.

use rusqlite::Connection;

pub const CURRENT_SCHEMA_VERSION: &str = "1";

const SCHEMA_SQL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    chunk_id INTEGER NOT NULL,
    title TEXT,
    agent TEXT,
    domain TEXT,
    workstream TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    content_type TEXT,
    review_by TEXT,
    modified REAL NOT NULL,
    content_hash TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 1.0,
    chunk_heading TEXT,
    text TEXT NOT NULL,
    UNIQUE(path, chunk_id)
);
CREATE INDEX IF NOT EXISTS idx_notes_path ON notes(path);

CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
    title,
    text,
    tags,
    content = 'notes',
    content_rowid = 'id'
);

CREATE TRIGGER IF NOT EXISTS notes_fts_insert AFTER INSERT ON notes BEGIN
    INSERT INTO notes_fts(rowid, title, text, tags)
    VALUES (new.id, new.title, new.text, new.tags);
END;

CREATE TRIGGER IF NOT EXISTS notes_fts_delete AFTER DELETE ON notes BEGIN
    INSERT INTO notes_fts(notes_fts, rowid, title, text, tags)
    VALUES ('delete', old.id, old.title, old.text, old.tags);
END;

CREATE TRIGGER IF NOT EXISTS notes_fts_update AFTER UPDATE ON notes BEGIN
    INSERT INTO notes_fts(notes_fts, rowid, title, text, tags)
    VALUES ('delete', old.id, old.title, old.text, old.tags);
    INSERT INTO notes_fts(rowid, title, text, tags)
    VALUES (new.id, new.title, new.text, new.tags);
END;

CREATE TABLE IF NOT EXISTS vectors (
    note_id INTEGER PRIMARY KEY REFERENCES notes(id) ON DELETE CASCADE,
    dim INTEGER NOT NULL,
    data BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pins (
    path TEXT PRIMARY KEY,
    pinned_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS claims (
    path TEXT NOT NULL,
    agent TEXT NOT NULL,
    claim_type TEXT NOT NULL,
    claimed_at REAL NOT NULL,
    expires_at REAL NOT NULL,
    PRIMARY KEY (path, agent)
);

CREATE TABLE IF NOT EXISTS graph_nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_type TEXT NOT NULL,
    name TEXT NOT NULL,
    note_id INTEGER REFERENCES notes(id) ON DELETE SET NULL,
    properties TEXT NOT NULL DEFAULT '{}',
    created_at REAL NOT NULL,
    UNIQUE(node_type, name)
);

CREATE TABLE IF NOT EXISTS graph_edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
    relationship TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1.0,
    properties TEXT NOT NULL DEFAULT '{}',
    UNIQUE(source_id, target_id, relationship)
);
CREATE INDEX IF NOT EXISTS idx_graph_edges_source ON graph_edges(source_id);
CREATE INDEX IF NOT EXISTS idx_graph_edges_target ON graph_edges(target_id);
"#;

pub fn apply_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        apply_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn fts_trigger_keeps_shadow_table_in_sync() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO notes (path, chunk_id, tags, modified, content_hash, text, title)
             VALUES ('a.md', 0, '[]', 0.0, 'hash', 'hello world', 'Title')",
            [],
        )
        .unwrap();
        let matched: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notes_fts WHERE notes_fts MATCH 'hello'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(matched, 1);

        conn.execute("DELETE FROM notes WHERE path = 'a.md'", [])
            .unwrap();
        let matched: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notes_fts WHERE notes_fts MATCH 'hello'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(matched, 0);
    }
}
