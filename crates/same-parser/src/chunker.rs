//! Heading-aware chunker.
//!
//! A note's body is either kept whole (one `(full)` chunk) or split on
//! level-2 headings so each section can be embedded and ranked on its own.
//! Chunks that are still too large to embed are re-split on paragraph
//! boundaries, and only hard-split on whitespace as a last resort for a
//! single paragraph that alone exceeds the cap.

#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    /// Below this size the whole body becomes a single `(full)` chunk.
    pub single_threshold_chars: usize,
    /// No chunk handed to the embedding provider may exceed this size.
    pub embed_cap_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            single_threshold_chars: 6_000,
            embed_cap_chars: 8_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedPiece {
    /// `None` for the whole-body chunk; `Some("(intro)")`, `Some("## Heading")`
    /// etc. otherwise.
    pub heading: Option<String>,
    pub text: String,
}

/// Split `body` into ordered chunks. Document order determines `chunk_id`
/// assignment by the caller (same-store), so callers must preserve the
/// returned `Vec` order as-is.
pub fn chunk_body(body: &str, config: &ChunkConfig) -> Vec<ChunkedPiece> {
    if body.chars().count() <= config.single_threshold_chars {
        return vec![ChunkedPiece {
            heading: Some("(full)".to_string()),
            text: body.to_string(),
        }];
    }

    let sections = split_on_level2_headings(body);
    let mut pieces = Vec::new();
    for section in sections {
        if section.text.chars().count() <= config.embed_cap_chars {
            pieces.push(section);
            continue;
        }
        pieces.extend(split_oversized(&section, config.embed_cap_chars));
    }
    pieces
}

/// Split on lines starting with `## ` (level-2 headings only). Any text
/// before the first such heading becomes the `(intro)` chunk, omitted if
/// empty.
fn split_on_level2_headings(body: &str) -> Vec<ChunkedPiece> {
    let mut sections: Vec<ChunkedPiece> = Vec::new();
    let mut current_heading: Option<String> = None;
    let mut current_text = String::new();

    let flush = |heading: Option<String>, text: String, sections: &mut Vec<ChunkedPiece>| {
        if text.trim().is_empty() {
            return;
        }
        sections.push(ChunkedPiece { heading, text });
    };

    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');
        if let Some(title) = trimmed.strip_prefix("## ") {
            flush(
                current_heading.take().or(Some("(intro)".to_string())),
                std::mem::take(&mut current_text),
                &mut sections,
            );
            current_heading = Some(format!("## {}", title.trim()));
            current_text.push_str(line);
        } else {
            current_text.push_str(line);
        }
    }
    flush(
        current_heading.or(Some("(intro)".to_string())),
        current_text,
        &mut sections,
    );

    if sections.is_empty() {
        sections.push(ChunkedPiece {
            heading: Some("(full)".to_string()),
            text: body.to_string(),
        });
    }
    sections
}

/// Re-split an oversized section by paragraph (blank-line-separated)
/// boundaries, packing paragraphs into chunks up to `cap` chars. A single
/// paragraph that alone exceeds `cap` is hard-split on whitespace.
fn split_oversized(section: &ChunkedPiece, cap: usize) -> Vec<ChunkedPiece> {
    let paragraphs: Vec<&str> = section.text.split("\n\n").collect();
    let mut out = Vec::new();
    let mut current = String::new();

    let mut push_current = |current: &mut String, out: &mut Vec<ChunkedPiece>| {
        if !current.trim().is_empty() {
            out.push(ChunkedPiece {
                heading: section.heading.clone(),
                text: std::mem::take(current),
            });
        } else {
            current.clear();
        }
    };

    for paragraph in paragraphs {
        if paragraph.chars().count() > cap {
            push_current(&mut current, &mut out);
            out.extend(hard_split_whitespace(paragraph, cap).into_iter().map(|text| {
                ChunkedPiece {
                    heading: section.heading.clone(),
                    text,
                }
            }));
            continue;
        }

        let candidate_len = if current.is_empty() {
            paragraph.chars().count()
        } else {
            current.chars().count() + 2 + paragraph.chars().count()
        };

        if candidate_len > cap && !current.is_empty() {
            push_current(&mut current, &mut out);
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    push_current(&mut current, &mut out);

    if out.is_empty() {
        out.push(ChunkedPiece {
            heading: section.heading.clone(),
            text: section.text.clone(),
        });
    }
    out
}

/// Last-resort split on whitespace boundaries, never splitting inside a
/// word, used only when one paragraph alone exceeds the cap.
fn hard_split_whitespace(text: &str, cap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = Vec::new();
    let mut current = String::new();

    for word in words {
        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate_len > cap && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        out.push(text.to_string());
    }
    out
}
