//! YAML frontmatter extraction.
//!
//! The frontmatter parser never fails: any malformed block falls back to
//! "no frontmatter, the whole file is body" rather than propagating an
//! error, because a single broken note must never take down a reindex.

use same_core::model::NoteMetadata;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNote {
    pub metadata: NoteMetadata,
    pub body: String,
}

const DELIMITER: &str = "---";

/// Parse `content` into typed metadata + body. On any parse failure, the
/// entire content becomes the body and metadata is empty — never fatal.
pub fn parse_frontmatter(content: &str) -> ParsedNote {
    match try_parse(content) {
        Some(parsed) => parsed,
        None => ParsedNote {
            metadata: NoteMetadata::default(),
            body: content.to_string(),
        },
    }
}

fn try_parse(content: &str) -> Option<ParsedNote> {
    let mut lines = content.split_inclusive('\n');
    let first_line = lines.next()?;
    if first_line.trim_end() != DELIMITER {
        return None;
    }

    // Find the closing `---` line and the byte offset where the body starts.
    let mut consumed = first_line.len();
    let mut block_end_offset = None;
    for line in content[consumed..].split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            block_end_offset = Some(consumed);
            consumed += line.len();
            break;
        }
        consumed += line.len();
    }
    let block_end = block_end_offset?;
    let yaml_block = &content[first_line.len()..block_end];
    let body = content[consumed..].to_string();

    let value: serde_yaml::Value = serde_yaml::from_str(yaml_block).ok()?;
    let mapping = value.as_mapping()?;

    let get_str = |key: &str| -> Option<String> {
        mapping
            .get(serde_yaml::Value::String(key.to_string()))
            .and_then(|v| match v {
                serde_yaml::Value::String(s) => Some(s.clone()),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                serde_yaml::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
    };

    let get_string_list = |key: &str| -> Vec<String> {
        let Some(v) = mapping.get(serde_yaml::Value::String(key.to_string())) else {
            return Vec::new();
        };
        match v {
            serde_yaml::Value::Sequence(seq) => seq
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            serde_yaml::Value::String(s) => s
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    };

    let title = get_str("title");
    let domain = get_str("domain");
    let workstream = get_str("workstream");
    let content_type = get_str("content_type");
    // `review-by` is accepted as an alias of `review_by`.
    let review_by = get_str("review_by").or_else(|| get_str("review-by"));
    let agent = get_str("agent").and_then(|a| validate_agent(&a));
    let tags = get_string_list("tags");
    let aliases = get_string_list("aliases");

    Some(ParsedNote {
        metadata: NoteMetadata {
            title,
            tags,
            domain,
            workstream,
            agent,
            content_type,
            review_by,
            aliases,
        },
        body,
    })
}

/// Agent provenance validation : ≤128 chars, no control chars, no
/// `\n`/`\r`/NUL. Invalid values are dropped rather than rejecting the note.
fn validate_agent(agent: &str) -> Option<String> {
    if agent.len() > 128 {
        return None;
    }
    if agent
        .chars()
        .any(|c| c == '\0' || c == '\n' || c == '\r' || c.is_control())
    {
        return None;
    }
    let trimmed = agent.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
