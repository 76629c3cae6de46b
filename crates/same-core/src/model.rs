//! Data model: notes, chunks, vectors, graph nodes and edges, claims.
//!
//! These are plain value types; ownership of the rows lives in `same-store`.
//! Nothing here talks to a database or the filesystem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix written at the top of any note `same` itself authors, so a reader
/// (human or agent) can tell it apart from a hand-written note. Glossary:
/// "Provenance header".
pub const PROVENANCE_HEADER_PREFIX: &str = "<!-- same:generated";

/// Frontmatter-derived metadata plus the parsed body, produced by
/// `same-parser::frontmatter` and consumed by the indexer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub domain: Option<String>,
    pub workstream: Option<String>,
    pub agent: Option<String>,
    pub content_type: Option<String>,
    pub review_by: Option<String>,
    /// Supplement: inert pass-through alias list, not part of any invariant.
    pub aliases: Vec<String>,
}

/// One row per `(path, chunk_id)`. `path` is vault-relative, POSIX-separated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub path: String,
    pub chunk_id: i64,
    pub title: Option<String>,
    pub agent: Option<String>,
    pub domain: Option<String>,
    pub workstream: Option<String>,
    pub tags: Vec<String>,
    pub content_type: Option<String>,
    pub review_by: Option<String>,
    pub modified: f64,
    /// Hex-encoded SHA-256 over the body only, never the frontmatter.
    pub content_hash: String,
    pub confidence: f32,
    pub chunk_heading: Option<String>,
    pub text: String,
}

/// Cap applied to [`Note::text`]; longer chunk text is never stored verbatim.
pub const CHUNK_TEXT_MAX_CHARS: usize = 10_000;

/// A dense embedding vector. Zero-length or all-zero is never a valid vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector(pub Vec<f32>);

impl Vector {
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.iter().any(|v| *v != 0.0)
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn cosine_similarity(&self, other: &Vector) -> f32 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let dot: f32 = self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum();
        let mag_a: f32 = self.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        let mag_b: f32 = other.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        if mag_a == 0.0 || mag_b == 0.0 {
            return 0.0;
        }
        dot / (mag_a * mag_b)
    }
}

/// Index mode persisted in the meta KV table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    Full,
    Lite,
}

impl std::fmt::Display for IndexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexMode::Full => write!(f, "full"),
            IndexMode::Lite => write!(f, "lite"),
        }
    }
}

impl std::str::FromStr for IndexMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(IndexMode::Full),
            "lite" => Ok(IndexMode::Lite),
            other => Err(format!("unknown index mode: {other}")),
        }
    }
}

/// Well-known meta keys stored in the `meta` key-value table.
pub mod meta_keys {
    pub const EMBED_PROVIDER: &str = "embed_provider";
    pub const EMBED_MODEL: &str = "embed_model";
    pub const EMBED_DIM: &str = "embed_dim";
    pub const INDEX_MODE: &str = "index_mode";
    pub const LAST_REINDEX_TIME: &str = "last_reindex_time";
    pub const SCHEMA_VERSION: &str = "schema_version";
}

/// Advisory lock recording that an agent holds read or write intent on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub path: String,
    pub agent: String,
    pub claim_type: ClaimType,
    pub claimed_at: f64,
    pub expires_at: f64,
}

impl Claim {
    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expires_at
    }
}

/// Typed knowledge-graph node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphNodeType {
    Note,
    File,
    Agent,
    Decision,
    Session,
    Entity,
    Concept,
}

impl std::fmt::Display for GraphNodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GraphNodeType::Note => "note",
            GraphNodeType::File => "file",
            GraphNodeType::Agent => "agent",
            GraphNodeType::Decision => "decision",
            GraphNodeType::Session => "session",
            GraphNodeType::Entity => "entity",
            GraphNodeType::Concept => "concept",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for GraphNodeType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "note" => GraphNodeType::Note,
            "file" => GraphNodeType::File,
            "agent" => GraphNodeType::Agent,
            "decision" => GraphNodeType::Decision,
            "session" => GraphNodeType::Session,
            "entity" => GraphNodeType::Entity,
            "concept" => GraphNodeType::Concept,
            other => return Err(format!("unknown graph node type: {other}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: i64,
    pub node_type: GraphNodeType,
    pub name: String,
    pub note_id: Option<i64>,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub created_at: f64,
}

/// Typed relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Imports,
    WorkedOn,
    Affects,
    Produced,
    Mentions,
    RelatedTo,
    DependsOn,
    References,
    Uses,
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Relationship::Imports => "imports",
            Relationship::WorkedOn => "worked_on",
            Relationship::Affects => "affects",
            Relationship::Produced => "produced",
            Relationship::Mentions => "mentions",
            Relationship::RelatedTo => "related_to",
            Relationship::DependsOn => "depends_on",
            Relationship::References => "references",
            Relationship::Uses => "uses",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Relationship {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "imports" => Relationship::Imports,
            "worked_on" => Relationship::WorkedOn,
            "affects" => Relationship::Affects,
            "produced" => Relationship::Produced,
            "mentions" => Relationship::Mentions,
            "related_to" => Relationship::RelatedTo,
            "depends_on" => Relationship::DependsOn,
            "references" => Relationship::References,
            "uses" => Relationship::Uses,
            other => return Err(format!("unknown relationship: {other}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub relationship: Relationship,
    pub weight: f32,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Direction for traversal operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultRegistryEntry {
    pub alias: String,
    pub absolute_path: std::path::PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_validity() {
        assert!(!Vector(vec![]).is_valid());
        assert!(!Vector(vec![0.0, 0.0, 0.0]).is_valid());
        assert!(Vector(vec![0.0, 1.0, 0.0]).is_valid());
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = Vector(vec![1.0, 2.0, 3.0]);
        let sim = v.cosine_similarity(&v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = Vector(vec![1.0, 0.0]);
        let b = Vector(vec![0.0, 1.0]);
        assert!(a.cosine_similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn index_mode_round_trips_through_str() {
        assert_eq!("full".parse::<IndexMode>().unwrap(), IndexMode::Full);
        assert_eq!("lite".parse::<IndexMode>().unwrap(), IndexMode::Lite);
        assert!("bogus".parse::<IndexMode>().is_err());
    }

    #[test]
    fn claim_expiry() {
        let claim = Claim {
            path: "a.md".into(),
            agent: "agent-1".into(),
            claim_type: ClaimType::Write,
            claimed_at: 0.0,
            expires_at: 100.0,
        };
        assert!(!claim.is_expired(50.0));
        assert!(claim.is_expired(100.0));
        assert!(claim.is_expired(150.0));
    }
}
