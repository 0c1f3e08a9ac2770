use std::time::Duration;

/// Classification of a failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network, HTTP, service, or storage failure; worth retrying.
    Transient,
    /// Bad geometry or malformed request; retrying cannot help.
    NonTransient,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with a cap.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay; attempt k (0-indexed) sleeps `base_wait * 2^k` before the next.
    pub base_wait: Duration,
    /// Upper bound on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_wait: Duration::from_secs(2),
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// Computes the decision after a failed attempt.
    ///
    /// `attempt` is 1-based (1 = first attempt just failed). Returns
    /// `NoRetry` once `max_attempts` attempts have been made.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if kind == ErrorKind::NonTransient || attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        // base_wait * 2^(attempt-1), capped. The shift saturates well past
        // any delay max_delay would let through.
        let exp = 1u32 << attempt.saturating_sub(1).min(20);
        let raw = self.base_wait.saturating_mul(exp);
        RetryDecision::RetryAfter(raw.min(self.max_delay))
    }
}
