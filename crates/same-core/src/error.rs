//! Error classification shared across every `same-*` crate.
//!
//! Each crate keeps its own concrete `Error` type (the way `crucible-sqlite`
//! and `crucible-watch` each define their own `thiserror` enum) rather than
//! funneling everything into one God enum. What they share is this
//! classification, so a caller can decide retry/log/report behavior from
//! `ErrorKind` alone, without matching on crate-specific variants.

use std::fmt;

/// The five error kinds an error can fall into, independent of which crate raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected by PathGuard, rejected agent/tag/status, oversized payload.
    /// Never retried, never logged as an error.
    InputValidation,
    /// Embedding backend failure, further classified by [`EmbedErrorReason`].
    EmbeddingBackend,
    /// Store-level failure; fatal for the operation, retried at most once
    /// for transient write-lock timeouts.
    Store,
    /// Distinct from error: the thing asked for does not exist.
    NotFound,
    /// An upstream error body that must be redacted before it is returned
    /// or logged.
    SanitizeThenReport,
}

/// Finer classification for [`ErrorKind::EmbeddingBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedErrorReason {
    ConnectionRefused,
    PermissionDenied,
    Timeout,
    DnsFailure,
    NetworkError,
}

impl EmbedErrorReason {
    /// Whether this failure mode is retryable under the retry policy.
    /// Everything is retryable except a terminal permission failure.
    pub fn is_retryable(self) -> bool {
        !matches!(self, EmbedErrorReason::PermissionDenied)
    }
}

impl fmt::Display for EmbedErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmbedErrorReason::ConnectionRefused => "connection_refused",
            EmbedErrorReason::PermissionDenied => "permission_denied",
            EmbedErrorReason::Timeout => "timeout",
            EmbedErrorReason::DnsFailure => "dns_failure",
            EmbedErrorReason::NetworkError => "network_error",
        };
        f.write_str(s)
    }
}

/// Implemented by every crate-local error type so callers can classify
/// without matching on crate-specific variants.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Replace any substring of `text` that looks like an API key assignment
/// (`key=sk-...`, `Authorization: Bearer ...`, etc.) with a redacted marker.
/// Used by the "sanitize-then-report" error path before an upstream error
/// body is surfaced or logged.
pub fn redact_secrets(text: &str) -> String {
    let re = regex::Regex::new(
        r#"(?i)(api[_-]?key|authorization|secret|token)(["']?\s*[:=]\s*["']?)([A-Za-z0-9\-_.]{8,})"#,
    )
    .expect("static redaction regex is valid");

    re.replace_all(text, "$1$2[REDACTED]").into_owned()
}
