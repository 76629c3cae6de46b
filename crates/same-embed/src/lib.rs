//! EmbeddingProvider interface and HTTP adapters.
//!
//! The core only ever depends on [`EmbeddingProvider`]; the two adapters in
//! this crate are the sole place that know about HTTP.

pub mod local;
pub mod openai_compatible;
pub mod retry;

use async_trait::async_trait;
use same_core::error::{Classify, EmbedErrorReason, ErrorKind};
use same_core::model::Vector;
use thiserror::Error;

/// Distinguishes the two embedding call sites: some models prefix the text
/// differently depending on whether it is being indexed or queried.
/// Providers that don't care simply ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Document,
    Query,
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding backend error ({reason}): {message}")]
    Backend {
        reason: EmbedErrorReason,
        message: String,
    },
    #[error("embedding provider rejected a non-local base URL: {0}")]
    NonLocalHost(String),
    #[error("embedding backend returned a response that could not be parsed: {0}")]
    MalformedResponse(String),
}

impl EmbedError {
    pub fn reason(&self) -> Option<EmbedErrorReason> {
        match self {
            EmbedError::Backend { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl Classify for EmbedError {
    fn kind(&self) -> ErrorKind {
        match self {
            EmbedError::Backend { .. } => ErrorKind::EmbeddingBackend,
            EmbedError::NonLocalHost(_) => ErrorKind::InputValidation,
            EmbedError::MalformedResponse(_) => ErrorKind::EmbeddingBackend,
        }
    }
}

/// Maps text to a fixed-dimension float vector. Constructed once at startup
/// and shared thereafter; never reconstructed mid-process.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str, purpose: Purpose) -> Result<Vector, EmbedError>;
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    fn dimensions(&self) -> usize;
}

/// Enforces the `EmbeddingProvider` contract on a freshly-parsed response:
/// the vector must have exactly `expected_dims` components and at least one
/// non-zero component. Both adapters call this before returning `Ok`.
pub fn validate_embedding(vector: Vector, expected_dims: usize) -> Result<Vector, EmbedError> {
    if vector.dimensions() != expected_dims || !vector.is_valid() {
        return Err(EmbedError::MalformedResponse(format!(
            "expected {expected_dims} non-zero dimensions, got {}",
            vector.dimensions()
        )));
    }
    Ok(vector)
}

/// Truncates `text` to at most `max_bytes` bytes on a UTF-8 char boundary.
/// The model-appropriate byte cap each adapter applies before the first send.
pub fn truncate_to_byte_cap(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Returns true if `host` resolves to a loopback address or the literal
/// string `localhost`, per the local-only provider contract.
pub fn is_local_host(host: &str) -> bool {
    let host = host.trim();
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let stripped = host.trim_start_matches('[').trim_end_matches(']');
    match stripped.parse::<std::net::IpAddr>() {
        Ok(ip) => ip.is_loopback(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_local_hosts() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("LOCALHOST"));
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("::1"));
        assert!(is_local_host("[::1]"));
    }

    #[test]
    fn rejects_non_local_hosts() {
        assert!(!is_local_host("example.com"));
        assert!(!is_local_host("10.0.0.5"));
        assert!(!is_local_host("evil.local"));
    }

    #[test]
    fn validate_embedding_rejects_wrong_dimensions() {
        let err = validate_embedding(Vector(vec![1.0, 1.0]), 3).unwrap_err();
        assert!(matches!(err, EmbedError::MalformedResponse(_)));
    }

    #[test]
    fn validate_embedding_rejects_all_zero() {
        let err = validate_embedding(Vector(vec![0.0, 0.0, 0.0]), 3).unwrap_err();
        assert!(matches!(err, EmbedError::MalformedResponse(_)));
    }

    #[test]
    fn validate_embedding_accepts_matching_nonzero_vector() {
        let vector = validate_embedding(Vector(vec![0.0, 1.0, 0.0]), 3).unwrap();
        assert_eq!(vector.dimensions(), 3);
    }

    #[test]
    fn truncate_to_byte_cap_is_a_noop_under_the_cap() {
        assert_eq!(truncate_to_byte_cap("hello", 100), "hello");
    }

    #[test]
    fn truncate_to_byte_cap_respects_char_boundaries() {
        let text = "a".repeat(10) + "é";
        let truncated = truncate_to_byte_cap(&text, 11);
        assert_eq!(truncated, "a".repeat(10));
        assert!(truncated.len() <= 11);
    }
}
