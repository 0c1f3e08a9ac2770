//! Error type for the compute-service boundary.

use thiserror::Error;

/// Failure reported by (or while talking to) the remote compute service.
///
/// `Geometry` is the one non-transient case: a degenerate or malformed tile
/// geometry will not get better on retry. Everything else is treated as
/// transient by the retry policy.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Bad or degenerate geometry; never retried.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// Service-side failure (compute error, task rejection, bad payload).
    #[error("remote service: {0}")]
    Service(String),

    /// Non-2xx HTTP status from the compute gateway.
    #[error("compute gateway returned HTTP {0}")]
    Http(u32),

    /// Transport-level failure reaching the gateway.
    #[error("gateway transport: {0}")]
    Transport(#[from] curl::Error),
}

impl RemoteError {
    /// True when retrying the same request can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, RemoteError::Geometry(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_geometry_is_non_transient() {
        assert!(!RemoteError::Geometry("empty ring".into()).is_transient());
        assert!(RemoteError::Service("boom".into()).is_transient());
        assert!(RemoteError::Http(503).is_transient());
    }
}
