//! Regex-driven knowledge-graph extraction: file references, agent
//! attribution, and decision sentences, plus an optional LLM pass.

use crate::error::GraphError;
use crate::llm::LlmExtractionClient;
use regex::Regex;
use same_core::model::{GraphNodeType, Relationship};
use same_store::Store;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// What `GraphExtractor::extract` needs about one already-indexed note.
pub struct ExtractionInput<'a> {
    pub note_id: i64,
    pub note_path: &'a str,
    pub content: &'a str,
    pub agent: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionSummary {
    pub file_references: usize,
    pub agent_links: usize,
    pub decisions: usize,
    pub llm_nodes: usize,
    pub llm_edges: usize,
}

fn go_style_reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b((?:internal|cmd|pkg)/[\w/]+\.go)\b").unwrap())
}

fn generic_reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([\w][\w.-]*/[\w.-]+(?:/[\w.-]+)*\.(?:go|md|yaml|yml|toml|json|sql|sh))\b")
            .unwrap()
    })
}

fn domain_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[a-z0-9.-]+\.(com|io|org|ai)(:\d+)?(/|$)").unwrap())
}

fn decision_colon_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:decided|decision|chose|chosen):\s*(.+)").unwrap())
}

fn decision_we_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)we (?:decided|chose) to\s+(.+?)(?:\.|$)").unwrap())
}

fn fenced_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```.*?```").unwrap())
}

const EXTERNAL_ROOT_PREFIXES: &[&str] = &[
    "users", "home", "private", "var", "opt", "etc", "root", "volumes", "mnt", "usr", "tmp",
];

const PLACEHOLDER_SUBSTRINGS: &[&str] = &[
    "path/to/",
    "yyyy-mm-dd",
    "vault_path",
    "_private/",
    "test_vault/",
    "foo.go",
];

const DECISION_INTENT_PREFIXES: &[&str] = &[
    "use ",
    "keep ",
    "adopt ",
    "split ",
    "pick ",
    "go with ",
    "plan is to ",
    "ship ",
    "shipped ",
];

const DECISION_INTENT_SUBSTRINGS: &[&str] = &[
    "decided",
    "chose",
    "chosen",
    "going with",
    "plan is to",
    "shipped",
    "picked",
];

const REGEX_ARTIFACT_MARKERS: &[&str] = &["(?:", "\\s", "\\w", "\\d", "(?i)"];

const DESCRIPTIVE_MARKERS: &[&str] = &["conversation mode detected", "injected or skipped"];

/// Join `base` (a vault-relative POSIX path, possibly with no directory
/// component) with a `../`/`./`-relative candidate, then clean `.`/`..`
/// segments. Manual POSIX joining, not `std::path`: candidates come from
/// free-text note content and always use `/`, independent of host OS.
fn join_relative(base_dir: &str, candidate: &str) -> Option<String> {
    let mut segments: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };
    for part in candidate.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return None;
                }
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn has_drive_letter_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// The full rejection pipeline behind a graph file-reference candidate.
/// Returns the cleaned, vault-relative path on success.
pub fn normalize_graph_reference_path(note_path: &str, candidate: &str) -> Option<String> {
    let lower = candidate.to_ascii_lowercase();
    if lower.contains("://") || lower.contains("http:") || lower.contains("https:") {
        return None;
    }
    if domain_like_re().is_match(candidate) {
        return None;
    }
    if candidate.starts_with('/')
        || candidate.starts_with("~/")
        || candidate.starts_with("//")
        || has_drive_letter_prefix(candidate)
    {
        return None;
    }

    let resolved = if candidate.starts_with("./") || candidate.starts_with("../") {
        join_relative(dirname(note_path), candidate)?
    } else {
        candidate.to_string()
    };

    if resolved == "." || resolved.is_empty() {
        return None;
    }
    if resolved.split('/').any(|s| s == "..") {
        return None;
    }

    let segments: Vec<&str> = resolved.split('/').collect();
    if segments.len() > 1 {
        for seg in &segments[..segments.len() - 1] {
            if seg.contains('.') {
                return None;
            }
        }
    }

    let resolved_lower = resolved.to_ascii_lowercase();
    if PLACEHOLDER_SUBSTRINGS
        .iter()
        .any(|p| resolved_lower.contains(p))
    {
        return None;
    }

    if resolved_lower.contains(".windsurf/worktrees/") || resolved_lower.contains(".git/worktrees/")
    {
        return None;
    }
    if let Some(first) = segments.first() {
        if EXTERNAL_ROOT_PREFIXES.contains(&first.to_ascii_lowercase().as_str()) {
            return None;
        }
    }

    Some(resolved)
}

fn normalize_decision_text(raw: &str) -> Option<String> {
    let mut text = raw.trim().to_string();

    while let Some(stripped) = text
        .strip_prefix('"')
        .or_else(|| text.strip_prefix('\''))
        .or_else(|| text.strip_prefix('`'))
    {
        text = stripped.to_string();
    }
    while let Some(stripped) = text
        .strip_suffix('"')
        .or_else(|| text.strip_suffix('\''))
        .or_else(|| text.strip_suffix('`'))
    {
        text = stripped.to_string();
    }
    while text.ends_with(['.', '!', '?', ',', ';', ':']) {
        text.pop();
    }
    text = text.trim().to_string();

    if text.len() < 10 {
        return None;
    }
    if text.contains("&&") || text.contains('|') || text.contains('>') || text.contains('`') {
        return None;
    }
    if text.contains("...") {
        return None;
    }
    if REGEX_ARTIFACT_MARKERS.iter().any(|m| text.contains(m)) {
        return None;
    }
    let lower = text.to_ascii_lowercase();
    if DESCRIPTIVE_MARKERS.iter().any(|m| lower.contains(m)) {
        return None;
    }
    if lower.starts_with("whether ") {
        return None;
    }

    let has_intent_prefix = DECISION_INTENT_PREFIXES.iter().any(|p| lower.starts_with(p));
    let has_intent_verb = DECISION_INTENT_SUBSTRINGS.iter().any(|v| lower.contains(v));
    if !has_intent_prefix && !has_intent_verb {
        return None;
    }

    const MAX_LEN: usize = 200;
    if text.chars().count() > MAX_LEN {
        let truncated: String = text.chars().take(MAX_LEN - 1).collect();
        text = format!("{truncated}\u{2026}");
    }

    Some(text)
}

/// Runs the full per-note extraction pipeline against an already-open
/// [`Store`]: reference, agent, decision, then (if configured) LLM passes.
pub struct GraphExtractor {
    llm: Option<Box<dyn LlmExtractionClient>>,
}

impl GraphExtractor {
    pub fn new() -> Self {
        Self { llm: None }
    }

    pub fn with_llm(llm: Box<dyn LlmExtractionClient>) -> Self {
        Self { llm: Some(llm) }
    }

    pub async fn extract(
        &self,
        store: &Store,
        input: &ExtractionInput<'_>,
        now: f64,
    ) -> Result<ExtractionSummary, GraphError> {
        let mut summary = ExtractionSummary::default();

        let note_node_id = same_store::graph::upsert_node(
            store,
            GraphNodeType::Note,
            input.note_path,
            Some(input.note_id),
            &BTreeMap::new(),
            now,
        )?;

        // Re-extracting a changed file starts from a clean slate so stale
        // references from the previous version don't accumulate.
        same_store::graph::delete_edges_from_node(store, note_node_id)?;

        for candidate in self.file_reference_candidates(input.content) {
            let Some(normalized) = normalize_graph_reference_path(input.note_path, &candidate)
            else {
                continue;
            };
            let node_type = if normalized.ends_with(".md") {
                GraphNodeType::Note
            } else {
                GraphNodeType::File
            };
            let target_id = same_store::graph::upsert_node(
                store,
                node_type,
                &normalized,
                None,
                &BTreeMap::new(),
                now,
            )?;
            same_store::graph::upsert_edge(
                store,
                note_node_id,
                target_id,
                Relationship::References,
                1.0,
            )?;
            summary.file_references += 1;
        }

        if let Some(agent) = input.agent.filter(|a| !a.is_empty()) {
            let agent_node_id = same_store::graph::upsert_node(
                store,
                GraphNodeType::Agent,
                agent,
                None,
                &BTreeMap::new(),
                now,
            )?;
            same_store::graph::upsert_edge(
                store,
                agent_node_id,
                note_node_id,
                Relationship::Produced,
                1.0,
            )?;
            summary.agent_links += 1;
        }

        for decision in self.decision_candidates(input.content) {
            let decision_node_id = same_store::graph::upsert_node(
                store,
                GraphNodeType::Decision,
                &decision,
                Some(input.note_id),
                &BTreeMap::new(),
                now,
            )?;
            same_store::graph::upsert_edge(
                store,
                decision_node_id,
                note_node_id,
                Relationship::Affects,
                1.0,
            )?;
            summary.decisions += 1;
        }

        if let Some(llm) = &self.llm {
            let extraction = llm.extract(input.content).await?;
            let mut by_name = BTreeMap::new();
            for node in &extraction.nodes {
                let node_type = node.node_type.parse().unwrap_or(GraphNodeType::Entity);
                let id = same_store::graph::upsert_node(
                    store,
                    node_type,
                    &node.name,
                    None,
                    &BTreeMap::new(),
                    now,
                )?;
                by_name.insert(node.name.clone(), id);
                same_store::graph::upsert_edge(
                    store,
                    note_node_id,
                    id,
                    Relationship::Mentions,
                    1.0,
                )?;
                summary.llm_nodes += 1;
            }
            for edge in &extraction.edges {
                let (Some(&source_id), Some(&target_id)) =
                    (by_name.get(&edge.source), by_name.get(&edge.target))
                else {
                    continue;
                };
                let relationship = edge.relation.parse().unwrap_or(Relationship::RelatedTo);
                same_store::graph::upsert_edge(store, source_id, target_id, relationship, 1.0)?;
                summary.llm_edges += 1;
            }
        }

        Ok(summary)
    }

    fn file_reference_candidates(&self, content: &str) -> Vec<String> {
        let mut out = Vec::new();
        for m in go_style_reference_re().find_iter(content) {
            out.push(m.as_str().to_string());
        }
        for m in generic_reference_re().find_iter(content) {
            out.push(m.as_str().to_string());
        }
        out
    }

    fn decision_candidates(&self, content: &str) -> Vec<String> {
        let stripped = fenced_code_re().replace_all(content, "");
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        for re in [decision_colon_re(), decision_we_re()] {
            for caps in re.captures_iter(&stripped) {
                let Some(raw) = caps.get(1) else { continue };
                let Some(normalized) = normalize_decision_text(raw.as_str()) else {
                    continue;
                };
                if seen.insert(normalized.clone()) {
                    out.push(normalized);
                }
            }
        }
        out
    }
}

impl Default for GraphExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_a_relative_reference_against_note_dirname() {
        let result = normalize_graph_reference_path("notes/current.md", "internal/store/db.go");
        assert_eq!(result.as_deref(), Some("internal/store/db.go"));
    }

    #[test]
    fn rejects_escaping_relative_path() {
        assert!(normalize_graph_reference_path("notes/current.md", "../../../etc/passwd").is_none());
    }

    #[test]
    fn rejects_url_like_candidate() {
        assert!(normalize_graph_reference_path("notes/a.md", "https://example.com/a.go").is_none());
        assert!(normalize_graph_reference_path("notes/a.md", "example.com/a.go").is_none());
    }

    #[test]
    fn rejects_absolute_and_home_and_drive_prefixes() {
        assert!(normalize_graph_reference_path("a.md", "/etc/passwd").is_none());
        assert!(normalize_graph_reference_path("a.md", "~/secrets.md").is_none());
        assert!(normalize_graph_reference_path("a.md", "C:/Windows/a.go").is_none());
    }

    #[test]
    fn rejects_non_final_segment_with_extension() {
        assert!(normalize_graph_reference_path("a.md", "README.md/sub.md").is_none());
    }

    #[test]
    fn rejects_placeholder_paths() {
        assert!(normalize_graph_reference_path("a.md", "path/to/foo.go").is_none());
        assert!(normalize_graph_reference_path("a.md", "test_vault/notes/x.md").is_none());
    }

    #[test]
    fn rejects_external_root_prefixes() {
        assert!(normalize_graph_reference_path("a.md", "home/user/notes.md").is_none());
        assert!(normalize_graph_reference_path("a.md", "tmp/scratch.sql").is_none());
    }

    #[test]
    fn accepts_plain_generic_reference() {
        let result = normalize_graph_reference_path("notes/a.md", "config/schema.yaml");
        assert_eq!(result.as_deref(), Some("config/schema.yaml"));
    }

    #[test]
    fn normalization_scenarios() {
        assert_eq!(
            normalize_graph_reference_path("notes/current.md", "./next.md").as_deref(),
            Some("notes/next.md")
        );
        assert!(normalize_graph_reference_path(
            "notes/current.md",
            "https://ollama.com/install.sh"
        )
        .is_none());
        assert!(normalize_graph_reference_path(
            "notes/current.md",
            "Users/jdoe/.windsurf/worktrees/proj/main.go"
        )
        .is_none());
        assert!(
            normalize_graph_reference_path("notes/current.md", "README.md/llms-install.md")
                .is_none()
        );
        assert_eq!(
            normalize_graph_reference_path("notes/current.md", "internal/store/db.go").as_deref(),
            Some("internal/store/db.go")
        );
    }

    #[test]
    fn decision_extraction_matches_scenario() {
        let extractor = GraphExtractor::new();
        let content = "\
Some background text.

```
Decision: use Redis for session storage.
```

We chose to keep regex extraction as the default fallback.

Decision: adopt deterministic chunking for indexing.
";
        let decisions = extractor.decision_candidates(content);
        assert_eq!(decisions.len(), 2);
        assert!(decisions
            .iter()
            .any(|d| d == "keep regex extraction as the default fallback"));
        assert!(decisions
            .iter()
            .any(|d| d == "adopt deterministic chunking for indexing"));
    }

    #[test]
    fn decision_extraction_rejects_short_and_artifact_text() {
        assert!(normalize_decision_text("use it").is_none());
        assert!(normalize_decision_text("decided: (?:whatever)\\s+pattern").is_none());
        assert!(normalize_decision_text("whether to use Redis or not").is_none());
        assert!(normalize_decision_text("conversation mode detected here today").is_none());
    }

    #[test]
    fn decision_text_is_deduplicated_within_a_note() {
        let extractor = GraphExtractor::new();
        let content = "Decision: use Redis for caching.\nDecision: use Redis for caching.\n";
        let decisions = extractor.decision_candidates(content);
        assert_eq!(decisions.len(), 1);
    }

    #[tokio::test]
    async fn extract_upserts_note_node_and_file_reference_edge() {
        let store = Store::memory().unwrap();
        let extractor = GraphExtractor::new();
        let input = ExtractionInput {
            note_id: 1,
            note_path: "notes/current.md",
            content: "See internal/store/db.go for the schema.",
            agent: Some("agent-1"),
        };
        let summary = extractor.extract(&store, &input, 0.0).await.unwrap();
        assert_eq!(summary.file_references, 1);
        assert_eq!(summary.agent_links, 1);

        let note_node = same_store::graph::find_node(&store, GraphNodeType::Note, "notes/current.md")
            .unwrap()
            .unwrap();
        let file_node =
            same_store::graph::find_node(&store, GraphNodeType::File, "internal/store/db.go")
                .unwrap()
                .unwrap();
        assert_eq!(note_node.note_id, Some(1));
        assert!(file_node.id > 0);
    }

    #[tokio::test]
    async fn reextraction_clears_stale_references() {
        let store = Store::memory().unwrap();
        let extractor = GraphExtractor::new();
        let first = ExtractionInput {
            note_id: 1,
            note_path: "a.md",
            content: "See internal/store/old.go.",
            agent: None,
        };
        extractor.extract(&store, &first, 0.0).await.unwrap();
        let second = ExtractionInput {
            note_id: 1,
            note_path: "a.md",
            content: "See internal/store/new.go.",
            agent: None,
        };
        extractor.extract(&store, &second, 1.0).await.unwrap();

        assert!(same_store::graph::find_node(&store, GraphNodeType::File, "internal/store/new.go")
            .unwrap()
            .is_some());

        let note_node = same_store::graph::find_node(&store, GraphNodeType::Note, "a.md")
            .unwrap()
            .unwrap();
        let remaining_edges: i64 = store
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM graph_edges WHERE source_id = ?1",
                    rusqlite::params![note_node.id],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(remaining_edges, 1);
    }
}
