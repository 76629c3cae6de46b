//! Retry policy shared by both adapters.
//!
//! Three attempts total, linear backoff (0s, 2s, 4s). Only network errors and
//! HTTP 5xx/429 are retried; 4xx is terminal except 429. A 500 on a long
//! input (>3000 chars) takes one halving-and-retry path instead of a bare
//! retry, modeling context-overflow recovery on the backend side.

use same_core::error::EmbedErrorReason;
use std::time::Duration;

pub const MAX_ATTEMPTS: u32 = 3;
const HALVING_INPUT_THRESHOLD: usize = 3_000;

pub fn backoff_for_attempt(attempt: u32) -> Duration {
    match attempt {
        1 => Duration::from_secs(0),
        2 => Duration::from_secs(2),
        _ => Duration::from_secs(4),
    }
}

/// Whether an HTTP status code should be retried at all.
pub fn status_is_retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Whether `status` + input length calls for the halving-and-retry path
/// rather than a bare retry: a 500 on input longer than the threshold.
pub fn should_halve_input(status: u16, input_chars: usize) -> bool {
    status == 500 && input_chars > HALVING_INPUT_THRESHOLD
}

pub fn reason_for_status(status: u16) -> EmbedErrorReason {
    match status {
        403 => EmbedErrorReason::PermissionDenied,
        _ => EmbedErrorReason::NetworkError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear_zero_two_four() {
        assert_eq!(backoff_for_attempt(1), Duration::from_secs(0));
        assert_eq!(backoff_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn only_5xx_and_429_are_retryable() {
        assert!(status_is_retryable(429));
        assert!(status_is_retryable(500));
        assert!(status_is_retryable(503));
        assert!(!status_is_retryable(400));
        assert!(!status_is_retryable(404));
    }

    #[test]
    fn halving_only_applies_to_500_on_long_input() {
        assert!(should_halve_input(500, 5_000));
        assert!(!should_halve_input(500, 100));
        assert!(!should_halve_input(503, 5_000));
    }
}
