//! Deterministic test doubles shared by downstream crates' test suites.
//! Grounded in `crucible-core::test_support::mocks` — small, hand-rolled
//! fakes rather than a mocking framework, since the traits involved are tiny.

use std::collections::BTreeMap;

/// A deterministic "embedding" for tests: hashes the input into a fixed-size
/// vector so the same text always produces the same vector and different
/// text (almost always) produces a different one, without pulling in a real
/// model.
pub fn deterministic_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut state: u64 = 1469598103934665603; // FNV offset basis
    for byte in text.bytes() {
        state ^= byte as u64;
        state = state.wrapping_mul(1099511628211); // FNV prime
    }
    (0..dimensions)
        .map(|i| {
            let mixed = state.wrapping_add(i as u64 * 2654435761);
            let normalized = (mixed % 2000) as f32 / 1000.0 - 1.0;
            if normalized == 0.0 {
                0.0001
            } else {
                normalized
            }
        })
        .collect()
}

/// A fixed note fixture used across parser/store/index/search/graph tests.
pub struct NoteFixture {
    pub path: &'static str,
    pub content: &'static str,
}

pub const SIMPLE_NOTE: NoteFixture = NoteFixture {
    path: "notes/simple.md",
    content: "---\ntitle: Simple Note\ntags: [alpha, beta]\ndomain: eng\n---\n\nJust a short body.\n",
};

pub const LONG_NOTE: NoteFixture = NoteFixture {
    path: "notes/long.md",
    content: include_str!("test_support_long_note.md"),
};

/// Minimal in-memory "LLM" double for the GraphExtractor's optional helper:
/// returns a canned node/edge extraction result for a given content prefix.
#[derive(Default)]
pub struct CannedLlmResponses {
    responses: BTreeMap<String, serde_json::Value>,
}

impl CannedLlmResponses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, content_prefix: impl Into<String>, response: serde_json::Value) -> Self {
        self.responses.insert(content_prefix.into(), response);
        self
    }

    pub fn lookup(&self, content: &str) -> Option<&serde_json::Value> {
        self.responses
            .iter()
            .find(|(prefix, _)| content.starts_with(prefix.as_str()))
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_embedding_is_stable() {
        let a = deterministic_embedding("hello world", 8);
        let b = deterministic_embedding("hello world", 8);
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn deterministic_embedding_differs_for_different_text() {
        let a = deterministic_embedding("hello", 8);
        let b = deterministic_embedding("world", 8);
        assert_ne!(a, b);
    }
}
