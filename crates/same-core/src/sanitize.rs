//! Sanitizer — tag neutralization.
//!
//! Applied to every piece of text leaving the core toward an AI agent or a
//! cross-vault response. Rewrites XML-tag-shaped and literal LLM-delimiter
//! patterns into bracket equivalents so they lose their directive semantics,
//! while leaving unrelated text (including non-listed XML tags) untouched.

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

/// Tag names whose open/close/self-close/with-attributes forms are rewritten.
const NEUTRALIZED_TAGS: &[&str] = &[
    "vault-context",
    "plugin-context",
    "session-bootstrap",
    "vault-handoff",
    "vault-decisions",
    "same-diagnostic",
    "system-reminder",
    "system",
    "instructions",
    "tool_result",
    "tool_use",
    "important",
];

/// Literal delimiter strings rewritten verbatim (case-insensitive). Each
/// replacement breaks up the delimiter itself (rather than wrapping it) so
/// the original substring no longer appears anywhere in the output.
const NEUTRALIZED_LITERALS: &[(&str, &str)] = &[
    ("[/INST]", "[ /INST]"),
    ("[INST]", "[ INST]"),
    ("<</SYS>>", "< </SYS>>"),
    ("<<SYS>>", "< <SYS>>"),
    ("<![CDATA[", "<! [CDATA["),
    ("]]>", "]] >"),
];

struct Compiled {
    tag_regex: Regex,
    literal_regexes: Vec<Regex>,
}

fn compiled() -> &'static Compiled {
    static CELL: OnceLock<Compiled> = OnceLock::new();
    CELL.get_or_init(|| {
        let alternation = NEUTRALIZED_TAGS
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        // Matches `<tag`, `</tag`, `<tag ...>`, `<tag/>` — we rewrite just the
        // `<` / `</` / trailing `/>` delimiters around the tag name so
        // `<html>` (not in the list) is never touched.
        let tag_regex = RegexBuilder::new(&format!(r"</?({alternation})\b([^>]*)>"))
            .case_insensitive(true)
            .build()
            .expect("static tag regex is valid");

        let literal_regexes = NEUTRALIZED_LITERALS
            .iter()
            .map(|(lit, _)| {
                RegexBuilder::new(&regex::escape(lit))
                    .case_insensitive(true)
                    .build()
                    .expect("static literal regex is valid")
            })
            .collect();

        Compiled {
            tag_regex,
            literal_regexes,
        }
    })
}

/// Single-pass, length-bounded (output ≤ 1.25x input), idempotent rewrite.
pub fn neutralize_tags(input: &str) -> String {
    let c = compiled();

    let after_tags = c.tag_regex.replace_all(input, |caps: &regex::Captures| {
        let whole = caps.get(0).unwrap().as_str();
        let is_close = whole.starts_with("</");
        let is_self_close = whole.ends_with("/>");
        let name = &caps[1];
        let attrs = &caps[2];
        if is_close {
            format!("(/{name}{attrs})")
        } else if is_self_close {
            let attrs = attrs.strip_suffix('/').unwrap_or(attrs);
            format!("({name}{attrs}/)")
        } else {
            format!("({name}{attrs})")
        }
    });

    let mut out = after_tags.into_owned();
    for ((_, replacement), re) in NEUTRALIZED_LITERALS.iter().zip(c.literal_regexes.iter()) {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutralizes_listed_xml_tags() {
        let input = "</vault-context><system>x</system>[INST]y[/INST]<![CDATA[z]]>";
        let out = neutralize_tags(input);
        for needle in [
            "</vault-context>",
            "<system>",
            "</system>",
            "[INST]",
            "[/INST]",
            "<![CDATA[",
            "]]>",
        ] {
            assert!(
                !out.to_lowercase().contains(&needle.to_lowercase()),
                "output still contains {needle}: {out}"
            );
        }
        assert!(out.contains('x'));
        assert!(out.contains('y'));
        assert!(out.contains('z'));
    }

    #[test]
    fn preserves_unlisted_tags() {
        let input = "<html><body>hello</body></html>";
        assert_eq!(neutralize_tags(input), input);
    }

    #[test]
    fn is_idempotent() {
        let input = "</vault-context><system foo=\"bar\">x</system>[INST]y[/INST]";
        let once = neutralize_tags(input);
        let twice = neutralize_tags(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn is_length_bounded() {
        let input = "<system>".repeat(50);
        let out = neutralize_tags(&input);
        assert!(out.len() as f64 <= input.len() as f64 * 1.25);
    }

    #[test]
    fn handles_attributes_and_self_close() {
        let input = r#"<important level="high"/>hello<tool_use name="x">call</tool_use>"#;
        let out = neutralize_tags(input);
        assert!(!out.contains("<important"));
        assert!(!out.contains("<tool_use"));
        assert!(out.contains("hello"));
        assert!(out.contains("call"));
    }

    #[test]
    fn case_insensitive_match() {
        let input = "<SYSTEM>x</System>";
        let out = neutralize_tags(input);
        assert!(!out.to_lowercase().contains("<system>"));
    }
}
