//! Graph traversal: one-hop neighbors, recursive-CTE path queries, shortest
//! path, bounded subgraphs, and aggregate stats.
//!
//! All multi-hop traversal runs as a single SQL statement against
//! `same-store`'s connection rather than walking an in-memory pointer graph
//! (Design Notes §9: "index + arena keeps memory bounded"). Cycle detection
//! is a substring match against a comma-joined path column, matching the
//! reference behavior the spec calls out rather than a visited-set carried
//! in Rust.

use crate::error::GraphError;
use rusqlite::named_params;
use same_core::model::{Direction, GraphEdge, GraphNode, Relationship};
use same_store::graph::{edge_row_to_graph_edge, get_node};
use same_store::Store;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Default and maximum recursion depth for [`query_graph`] and the cap
/// applied to [`find_shortest_path`].
pub const DEFAULT_DEPTH: usize = 5;
pub const MAX_DEPTH: usize = 10;
/// `query_graph` never returns more than this many discovered paths.
pub const MAX_PATHS: usize = 1_000;

#[derive(Debug, Clone)]
pub struct GraphQueryOptions {
    pub start_node_id: i64,
    pub relationship: Option<Relationship>,
    /// Only `Forward` and `Reverse` are valid for recursive traversal;
    /// `Both` is rejected with [`GraphError::UnknownDirection`].
    pub direction: Direction,
    pub max_depth: usize,
}

impl GraphQueryOptions {
    pub fn new(start_node_id: i64) -> Self {
        Self {
            start_node_id,
            relationship: None,
            direction: Direction::Forward,
            max_depth: DEFAULT_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    pub total_nodes: i64,
    pub total_edges: i64,
    pub avg_degree: f64,
    pub nodes_by_type: BTreeMap<String, i64>,
    pub edges_by_relationship: BTreeMap<String, i64>,
}

pub struct GraphQuery<'a> {
    store: &'a Store,
}

impl<'a> GraphQuery<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// One SQL hop from `node_id`, optionally filtered by relationship,
    /// in the given direction (`Both` unions forward and reverse hops).
    pub fn get_neighbors(
        &self,
        node_id: i64,
        relationship: Option<Relationship>,
        direction: Direction,
    ) -> Result<Vec<GraphEdge>, GraphError> {
        self.store.with_connection(|conn| {
            let rel_filter = relationship.map(|r| r.to_string());
            let mut out = Vec::new();
            if matches!(direction, Direction::Forward | Direction::Both) {
                let mut stmt = conn.prepare(
                    "SELECT * FROM graph_edges WHERE source_id = ?1
                     AND (?2 IS NULL OR relationship = ?2)",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![node_id, rel_filter], edge_row_to_graph_edge)?
                    .collect::<Result<Vec<_>, _>>()?;
                out.extend(rows);
            }
            if matches!(direction, Direction::Reverse | Direction::Both) {
                let mut stmt = conn.prepare(
                    "SELECT * FROM graph_edges WHERE target_id = ?1
                     AND (?2 IS NULL OR relationship = ?2)",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![node_id, rel_filter], edge_row_to_graph_edge)?
                    .collect::<Result<Vec<_>, _>>()?;
                out.extend(rows);
            }
            Ok(out)
        })?
    }

    /// Recursive, cycle-safe, depth-bounded traversal from
    /// `opts.start_node_id`. Depth defaults to 5, capped at 10. Returns up
    /// to 1 000 discovered paths, each with its full node and edge sequence
    /// (edge IDs are always carried through the recursion, so `edges` is
    /// never degraded to empty for a recoverable path).
    pub fn query_graph(&self, opts: &GraphQueryOptions) -> Result<Vec<PathResult>, GraphError> {
        let direction = match opts.direction {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
            Direction::Both => {
                return Err(GraphError::UnknownDirection(
                    "query_graph only supports forward or reverse".to_string(),
                ))
            }
        };

        if get_node(self.store, opts.start_node_id)?.is_none() {
            return Err(GraphError::StartNodeNotFound(opts.start_node_id));
        }

        let max_depth = opts.max_depth.min(MAX_DEPTH);
        let relationship = opts.relationship.map(|r| r.to_string());

        let rows: Vec<(i64, String, String, i64)> = self.store.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "WITH RECURSIVE traverse(node_id, node_path, edge_path, depth) AS (
                    SELECT :start, ',' || :start || ',', '', 0
                    UNION ALL
                    SELECT
                        CASE WHEN :direction = 'forward' THEN e.target_id ELSE e.source_id END,
                        t.node_path || (CASE WHEN :direction = 'forward' THEN e.target_id ELSE e.source_id END) || ',',
                        t.edge_path || e.id || ',',
                        t.depth + 1
                    FROM graph_edges e
                    JOIN traverse t ON (
                        (:direction = 'forward' AND e.source_id = t.node_id)
                        OR (:direction = 'reverse' AND e.target_id = t.node_id)
                    )
                    WHERE t.depth < :max_depth
                      AND (:relationship IS NULL OR e.relationship = :relationship)
                      AND t.node_path NOT LIKE
                          '%,' || (CASE WHEN :direction = 'forward' THEN e.target_id ELSE e.source_id END) || ',%'
                )
                SELECT node_id, node_path, edge_path, depth FROM traverse
                WHERE depth > 0
                ORDER BY depth ASC
                LIMIT :limit",
            )?;
            let rows = stmt
                .query_map(
                    named_params! {
                        ":start": opts.start_node_id,
                        ":direction": direction,
                        ":max_depth": max_depth as i64,
                        ":relationship": relationship,
                        ":limit": MAX_PATHS as i64,
                    },
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut results = Vec::with_capacity(rows.len());
        for (_, node_path, edge_path, _) in rows {
            let node_ids = parse_comma_list(&node_path);
            let edge_ids = parse_comma_list(&edge_path);
            let nodes = self.fetch_nodes(&node_ids)?;
            let edges = self.fetch_edges(&edge_ids)?;
            results.push(PathResult { nodes, edges });
        }
        Ok(results)
    }

    /// Recursive-CTE breadth-first search over forward edges only, depth
    /// capped at 10, cycle-safe, returning the minimum-depth path. A
    /// self-path (`from == to`) is a length-1 node list with zero edges.
    pub fn find_shortest_path(&self, from: i64, to: i64) -> Result<PathResult, GraphError> {
        let start_node = get_node(self.store, from)?.ok_or(GraphError::StartNodeNotFound(from))?;

        if from == to {
            return Ok(PathResult {
                nodes: vec![start_node],
                edges: vec![],
            });
        }

        let rows: Vec<(i64, String, String, i64)> = self.store.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "WITH RECURSIVE traverse(node_id, node_path, edge_path, depth) AS (
                    SELECT :start, ',' || :start || ',', '', 0
                    UNION ALL
                    SELECT e.target_id,
                        t.node_path || e.target_id || ',',
                        t.edge_path || e.id || ',',
                        t.depth + 1
                    FROM graph_edges e
                    JOIN traverse t ON e.source_id = t.node_id
                    WHERE t.depth < :max_depth
                      AND t.node_path NOT LIKE '%,' || e.target_id || ',%'
                )
                SELECT node_id, node_path, edge_path, depth FROM traverse
                WHERE depth > 0 AND node_id = :target
                ORDER BY depth ASC
                LIMIT 1",
            )?;
            let rows = stmt
                .query_map(
                    named_params! {
                        ":start": from,
                        ":target": to,
                        ":max_depth": MAX_DEPTH as i64,
                    },
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let Some((_, node_path, edge_path, _)) = rows.into_iter().next() else {
            return Ok(PathResult::default());
        };

        let nodes = self.fetch_nodes(&parse_comma_list(&node_path))?;
        let edges = self.fetch_edges(&parse_comma_list(&edge_path))?;
        Ok(PathResult { nodes, edges })
    }

    /// All edges touching `node_id` and reachable within `depth` hops
    /// (clamped to `[1,3]`), together with every node those edges reference.
    pub fn get_subgraph(&self, node_id: i64, depth: usize) -> Result<Subgraph, GraphError> {
        if get_node(self.store, node_id)?.is_none() {
            return Err(GraphError::StartNodeNotFound(node_id));
        }
        let depth = depth.clamp(1, 3);

        let mut visited: BTreeSet<i64> = BTreeSet::new();
        visited.insert(node_id);
        let mut frontier: VecDeque<i64> = VecDeque::new();
        frontier.push_back(node_id);

        let mut edge_ids: BTreeSet<i64> = BTreeSet::new();
        for _ in 0..depth {
            let mut next_frontier = Vec::new();
            for current in frontier.drain(..) {
                let edges = self.get_neighbors(current, None, Direction::Both)?;
                for edge in edges {
                    edge_ids.insert(edge.id);
                    let other = if edge.source_id == current {
                        edge.target_id
                    } else {
                        edge.source_id
                    };
                    if visited.insert(other) {
                        next_frontier.push(other);
                    }
                }
            }
            frontier.extend(next_frontier);
            if frontier.is_empty() {
                break;
            }
        }

        let edges = self.fetch_edges(&edge_ids.into_iter().collect::<Vec<_>>())?;
        let node_ids: BTreeSet<i64> = edges
            .iter()
            .flat_map(|e| [e.source_id, e.target_id])
            .chain(std::iter::once(node_id))
            .collect();
        let nodes = self.fetch_nodes(&node_ids.into_iter().collect::<Vec<_>>())?;
        Ok(Subgraph { nodes, edges })
    }

    /// Totals, per-type and per-relationship histograms, and
    /// `avg_degree = 2*|E|/|V|`.
    pub fn get_stats(&self) -> Result<GraphStats, GraphError> {
        self.store.with_connection(|conn| {
            let total_nodes: i64 = conn.query_row("SELECT COUNT(*) FROM graph_nodes", [], |r| r.get(0))?;
            let total_edges: i64 = conn.query_row("SELECT COUNT(*) FROM graph_edges", [], |r| r.get(0))?;

            let mut nodes_by_type = BTreeMap::new();
            let mut stmt = conn.prepare("SELECT node_type, COUNT(*) FROM graph_nodes GROUP BY node_type")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                let (k, v) = row?;
                nodes_by_type.insert(k, v);
            }

            let mut edges_by_relationship = BTreeMap::new();
            let mut stmt =
                conn.prepare("SELECT relationship, COUNT(*) FROM graph_edges GROUP BY relationship")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                let (k, v) = row?;
                edges_by_relationship.insert(k, v);
            }

            let avg_degree = if total_nodes == 0 {
                0.0
            } else {
                2.0 * total_edges as f64 / total_nodes as f64
            };

            Ok(GraphStats {
                total_nodes,
                total_edges,
                avg_degree,
                nodes_by_type,
                edges_by_relationship,
            })
        })?
    }

    fn fetch_nodes(&self, ids: &[i64]) -> Result<Vec<GraphNode>, GraphError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = get_node(self.store, *id)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    fn fetch_edges(&self, ids: &[i64]) -> Result<Vec<GraphEdge>, GraphError> {
        self.store.with_connection(|conn| {
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(edge) = conn
                    .query_row(
                        "SELECT * FROM graph_edges WHERE id = ?1",
                        rusqlite::params![id],
                        edge_row_to_graph_edge,
                    )
                    .ok()
                {
                    out.push(edge);
                }
            }
            Ok(out)
        })?
    }
}

fn parse_comma_list(s: &str) -> Vec<i64> {
    s.split(',').filter_map(|p| p.parse::<i64>().ok()).collect()
}
