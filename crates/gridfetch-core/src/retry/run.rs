//! Retry loop: run a closure until success or the policy says stop.

use super::classify::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::sleep::Sleeper;

/// Runs `f` until it succeeds or the policy stops retrying.
///
/// Every failed attempt is logged as a warning with its attempt number;
/// between attempts the backoff delay is spent in `sleeper`. The final
/// error is returned for the caller to log and absorb; nothing here
/// panics or escalates.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    what: &str,
    mut f: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                tracing::warn!(
                    "{}: attempt {}/{} failed: {}",
                    what,
                    attempt,
                    policy.max_attempts,
                    e
                );
                match policy.decide(attempt, classify(&e)) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        sleeper.sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
