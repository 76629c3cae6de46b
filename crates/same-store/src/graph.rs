//! Graph node/edge persistence. Traversal (shortest path, subgraph, stats)
//! lives in `same-graph`, which runs its own SQL against `Store::with_connection`
//! — this module only owns the write path and simple lookups.

use crate::error::StoreError;
use crate::pool::Store;
use rusqlite::{params, OptionalExtension};
use same_core::model::{GraphEdge, GraphNode, GraphNodeType, Relationship};
use std::collections::BTreeMap;

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphNode> {
    let node_type: String = row.get("node_type")?;
    let properties_json: String = row.get("properties")?;
    Ok(GraphNode {
        id: row.get("id")?,
        node_type: node_type.parse().unwrap_or(GraphNodeType::Entity),
        name: row.get("name")?,
        note_id: row.get("note_id")?,
        properties: serde_json::from_str(&properties_json).unwrap_or_default(),
        created_at: row.get("created_at")?,
    })
}

/// Insert a node if `(node_type, name)` is new, otherwise return the
/// existing node's id. Keeps extraction idempotent across re-indexing.
pub fn upsert_node(
    store: &Store,
    node_type: GraphNodeType,
    name: &str,
    note_id: Option<i64>,
    properties: &BTreeMap<String, serde_json::Value>,
    created_at: f64,
) -> Result<i64, StoreError> {
    let properties_json = serde_json::to_string(properties)?;
    store.with_connection_mut(|conn| {
        conn.execute(
            "INSERT INTO graph_nodes (node_type, name, note_id, properties, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(node_type, name) DO UPDATE SET
                note_id = COALESCE(excluded.note_id, graph_nodes.note_id),
                properties = excluded.properties",
            params![
                node_type.to_string(),
                name,
                note_id,
                properties_json,
                created_at
            ],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM graph_nodes WHERE node_type = ?1 AND name = ?2",
            params![node_type.to_string(), name],
            |row| row.get(0),
        )?;
        Ok(id)
    })
}

pub fn get_node(store: &Store, id: i64) -> Result<Option<GraphNode>, StoreError> {
    store.with_connection(|conn| {
        Ok(conn
            .query_row("SELECT * FROM graph_nodes WHERE id = ?1", params![id], row_to_node)
            .optional()?)
    })
}

pub fn find_node(
    store: &Store,
    node_type: GraphNodeType,
    name: &str,
) -> Result<Option<GraphNode>, StoreError> {
    store.with_connection(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM graph_nodes WHERE node_type = ?1 AND name = ?2",
                params![node_type.to_string(), name],
                row_to_node,
            )
            .optional()?)
    })
}

/// Insert an edge if the `(source, target, relationship)` triple is new;
/// otherwise bump its weight. Graph extraction runs per file, sequentially,
/// inside the single collector, so this is never raced.
pub fn upsert_edge(
    store: &Store,
    source_id: i64,
    target_id: i64,
    relationship: Relationship,
    weight: f32,
) -> Result<i64, StoreError> {
    store.with_connection_mut(|conn| {
        conn.execute(
            "INSERT INTO graph_edges (source_id, target_id, relationship, weight, properties)
             VALUES (?1, ?2, ?3, ?4, '{}')
             ON CONFLICT(source_id, target_id, relationship) DO UPDATE SET
                weight = graph_edges.weight + excluded.weight",
            params![source_id, target_id, relationship.to_string(), weight],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM graph_edges WHERE source_id = ?1 AND target_id = ?2 AND relationship = ?3",
            params![source_id, target_id, relationship.to_string()],
            |row| row.get(0),
        )?;
        Ok(id)
    })
}

/// Remove every edge whose source is a note-bound node for `note_id` and
/// whose relationship is one the extractor produces. Called before
/// re-extracting a changed file so stale references don't accumulate.
pub fn delete_edges_from_node(store: &Store, source_id: i64) -> Result<usize, StoreError> {
    store.with_connection_mut(|conn| {
        Ok(conn.execute(
            "DELETE FROM graph_edges WHERE source_id = ?1",
            params![source_id],
        )?)
    })
}

/// Delete a node outright. `graph_edges` rows touching it cascade via the
/// schema's `ON DELETE CASCADE`; a note-bound node instead sets `note_id`
/// to NULL on the note's own deletion, never the other way around.
pub fn delete_node(store: &Store, node_id: i64) -> Result<(), StoreError> {
    store.with_connection_mut(|conn| {
        conn.execute("DELETE FROM graph_nodes WHERE id = ?1", params![node_id])?;
        Ok(())
    })
}

pub fn edge_row_to_graph_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphEdge> {
    let relationship: String = row.get("relationship")?;
    let properties_json: String = row.get("properties")?;
    Ok(GraphEdge {
        id: row.get("id")?,
        source_id: row.get("source_id")?,
        target_id: row.get("target_id")?,
        relationship: relationship.parse().unwrap_or(Relationship::RelatedTo),
        weight: row.get("weight")?,
        properties: serde_json::from_str(&properties_json).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_node_is_idempotent_by_type_and_name() {
        let store = Store::memory().unwrap();
        let id1 = upsert_node(&store, GraphNodeType::Note, "hub.md", None, &BTreeMap::new(), 0.0).unwrap();
        let id2 = upsert_node(&store, GraphNodeType::Note, "hub.md", None, &BTreeMap::new(), 0.0).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn upsert_edge_accumulates_weight_on_repeat() {
        let store = Store::memory().unwrap();
        let a = upsert_node(&store, GraphNodeType::Note, "a.md", None, &BTreeMap::new(), 0.0).unwrap();
        let b = upsert_node(&store, GraphNodeType::Note, "b.md", None, &BTreeMap::new(), 0.0).unwrap();
        upsert_edge(&store, a, b, Relationship::References, 1.0).unwrap();
        upsert_edge(&store, a, b, Relationship::References, 1.0).unwrap();

        let weight: f32 = store
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT weight FROM graph_edges WHERE source_id = ?1 AND target_id = ?2",
                    params![a, b],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(weight, 2.0);
    }

    #[test]
    fn upsert_node_coalesces_note_id_instead_of_nulling_it() {
        let store = Store::memory().unwrap();
        let id1 = upsert_node(&store, GraphNodeType::Note, "hub.md", Some(42), &BTreeMap::new(), 0.0).unwrap();
        let id2 = upsert_node(&store, GraphNodeType::Note, "hub.md", None, &BTreeMap::new(), 0.0).unwrap();
        assert_eq!(id1, id2);
        let node = get_node(&store, id2).unwrap().unwrap();
        assert_eq!(node.note_id, Some(42));
    }

    #[test]
    fn delete_edges_from_node_only_affects_its_outgoing_edges() {
        let store = Store::memory().unwrap();
        let a = upsert_node(&store, GraphNodeType::Note, "a.md", None, &BTreeMap::new(), 0.0).unwrap();
        let b = upsert_node(&store, GraphNodeType::Note, "b.md", None, &BTreeMap::new(), 0.0).unwrap();
        upsert_edge(&store, a, b, Relationship::References, 1.0).unwrap();
        upsert_edge(&store, b, a, Relationship::References, 1.0).unwrap();

        delete_edges_from_node(&store, a).unwrap();

        let remaining: i64 = store
            .with_connection(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM graph_edges", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[test]
    fn deleting_a_node_removes_every_edge_touching_it() {
        let store = Store::memory().unwrap();
        let a = upsert_node(&store, GraphNodeType::Note, "a.md", None, &BTreeMap::new(), 0.0).unwrap();
        let b = upsert_node(&store, GraphNodeType::Note, "b.md", None, &BTreeMap::new(), 0.0).unwrap();
        let c = upsert_node(&store, GraphNodeType::Note, "c.md", None, &BTreeMap::new(), 0.0).unwrap();
        upsert_edge(&store, a, b, Relationship::References, 1.0).unwrap();
        upsert_edge(&store, b, a, Relationship::References, 1.0).unwrap();
        upsert_edge(&store, b, c, Relationship::References, 1.0).unwrap();

        delete_node(&store, b).unwrap();

        let remaining: i64 = store
            .with_connection(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM graph_edges", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(get_node(&store, b).unwrap().is_none());
    }
}
