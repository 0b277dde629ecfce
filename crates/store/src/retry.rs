//! Retry classification and backoff policy for the remote client.
//!
//! Transient classes (timeouts, connection failures, 5xx, 429, rate
//! limiting) are retried with exponential backoff plus jitter. Everything
//! else — other 4xx, unique-constraint violations, permission errors — is
//! permanent and surfaces immediately.

use std::time::Duration;

use rand::Rng;

/// Whether an HTTP status code belongs to a transient failure class.
pub fn status_retriable(status: u16) -> bool {
    status >= 500 || status == 429
}

const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection",
    "network",
    "temporarily unavailable",
    "too many connections",
    "server is busy",
    "rate limit",
];

const PERMANENT_MARKERS: &[&str] = &[
    "permission denied",
    "invalid input",
    "duplicate key",
    "violates unique constraint",
    "violates foreign key constraint",
    "not found",
];

/// Classify a transport error message when no status code is available.
///
/// Permanent markers win over transient ones; unknown errors default to
/// retriable (the safer choice for network-shaped failures).
pub fn message_retriable(message: &str) -> bool {
    let lower = message.to_lowercase();
    if PERMANENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }
    true
}

/// Delay before retry attempt `attempt` (1-based): `base * 2^(attempt-1)`
/// plus up to 50% jitter.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let jitter = rand::thread_rng().gen_range(0..=exp / 2 + 1);
    Duration::from_millis(exp + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_hundreds_and_429_are_transient() {
        assert!(status_retriable(500));
        assert!(status_retriable(503));
        assert!(status_retriable(429));
    }

    #[test]
    fn other_client_errors_are_permanent() {
        assert!(!status_retriable(400));
        assert!(!status_retriable(404));
        assert!(!status_retriable(409));
        assert!(!status_retriable(403));
    }

    #[test]
    fn constraint_violations_never_retry() {
        assert!(!message_retriable("duplicate key value violates unique constraint"));
        assert!(!message_retriable("permission denied for table conversations"));
    }

    #[test]
    fn connection_failures_retry() {
        assert!(message_retriable("connection refused"));
        assert!(message_retriable("operation timed out"));
    }

    #[test]
    fn backoff_grows_exponentially() {
        for _ in 0..20 {
            let d1 = backoff_delay(100, 1).as_millis() as u64;
            let d3 = backoff_delay(100, 3).as_millis() as u64;
            assert!((100..=151).contains(&d1), "d1 = {d1}");
            assert!((400..=601).contains(&d3), "d3 = {d3}");
        }
    }
}
