//! Retry and backoff policy.
//!
//! One policy value drives every fetch attempt: exponential backoff
//! (`base_wait * 2^k` after 0-indexed attempt `k`, capped) for transient
//! failures, immediate stop for non-transient ones. Sleeping goes through
//! the injected `Sleeper` so tests stay deterministic.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::classify;
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
