use std::collections::HashMap;

/// α in the hybrid blend `α·normalized_vector + (1−α)·normalized_bm25`.
pub const HYBRID_ALPHA: f32 = 0.7;

/// Flat score tier 3 would use if match density were ever zero for every
/// candidate (it never is, since a candidate only exists because a term
/// matched) — kept for documentation of where `search.rs`'s match-density
/// tier replaces the simpler constant spec.md's own fallback describes.
pub const LIKE_FALLBACK_FLOOR: f32 = 0.5;

/// Min-max normalize `scores` into `[0, 1]`. A single value, or every value
/// equal, normalizes to `1.0` — "this is the best (and only) match" rather
/// than collapsing to zero.
pub fn normalize(scores: &HashMap<(String, i64), f32>) -> HashMap<(String, i64), f32> {
    if scores.is_empty() {
        return HashMap::new();
    }
    let min = scores.values().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.values().cloned().fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return scores.keys().cloned().map(|k| (k, 1.0)).collect();
    }
    scores
        .iter()
        .map(|(k, v)| (k.clone(), (v - min) / (max - min)))
        .collect()
}

/// Case-insensitive occurrence count of `term` in `haystack`.
pub fn count_occurrences(haystack: &str, term: &str) -> usize {
    if term.is_empty() {
        return 0;
    }
    let haystack = haystack.to_lowercase();
    let term = term.to_lowercase();
    haystack.matches(term.as_str()).count()
}

/// Match-density score for the `LIKE` fallback tier: total case-insensitive
/// occurrences of every query term across title/text/tags/heading,
/// normalized by the text length so a short exact match outranks a long
/// document that happens to repeat a term once.
pub fn match_density(
    terms: &[String],
    title: Option<&str>,
    text: &str,
    tags: &[String],
    heading: Option<&str>,
) -> f32 {
    let tags_joined = tags.join(" ");
    let haystacks = [title.unwrap_or(""), text, tags_joined.as_str(), heading.unwrap_or("")];
    let total: usize = terms
        .iter()
        .map(|term| haystacks.iter().map(|h| count_occurrences(h, term)).sum::<usize>())
        .sum();
    let length = text.chars().count().max(1) as f32;
    (total as f32 / length).max(0.0)
}

/// Collapse a scored candidate list to the single best-scoring chunk per
/// note path — a hit list should surface distinct notes, not every chunk of
/// the same note competing for the same rank.
pub fn dedup_best_per_note(scored: Vec<((String, i64), f32)>) -> Vec<((String, i64), f32)> {
    let mut best: HashMap<String, ((String, i64), f32)> = HashMap::new();
    for (key, score) in scored {
        best.entry(key.0.clone())
            .and_modify(|existing| {
                if score > existing.1 {
                    *existing = (key.clone(), score);
                }
            })
            .or_insert((key, score));
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_to_one_when_all_equal() {
        let mut scores = HashMap::new();
        scores.insert(("a.md".to_string(), 0), 0.5);
        scores.insert(("b.md".to_string(), 0), 0.5);
        let normalized = normalize(&scores);
        assert_eq!(normalized[&("a.md".to_string(), 0)], 1.0);
        assert_eq!(normalized[&("b.md".to_string(), 0)], 1.0);
    }

    #[test]
    fn normalize_spans_zero_to_one() {
        let mut scores = HashMap::new();
        scores.insert(("a.md".to_string(), 0), 1.0);
        scores.insert(("b.md".to_string(), 0), 3.0);
        let normalized = normalize(&scores);
        assert_eq!(normalized[&("a.md".to_string(), 0)], 0.0);
        assert_eq!(normalized[&("b.md".to_string(), 0)], 1.0);
    }

    #[test]
    fn match_density_favors_shorter_denser_text() {
        let short = match_density(&["rust".to_string()], None, "rust rust", &[], None);
        let long = match_density(
            &["rust".to_string()],
            None,
            "rust and a lot of other unrelated filler text that goes on",
            &[],
            None,
        );
        assert!(short > long);
    }

    #[test]
    fn dedup_best_per_note_keeps_the_higher_scoring_chunk() {
        let scored = vec![
            (("a.md".to_string(), 0), 0.2),
            (("a.md".to_string(), 1), 0.9),
            (("b.md".to_string(), 0), 0.5),
        ];
        let deduped = dedup_best_per_note(scored);
        assert_eq!(deduped.len(), 2);
        let a = deduped.iter().find(|(k, _)| k.0 == "a.md").unwrap();
        assert_eq!(a.0 .1, 1);
        assert_eq!(a.1, 0.9);
    }
}
