//! Error type for one fetch attempt, kept concrete so the policy can
//! classify it before anything is flattened into anyhow.

use std::fmt;

use crate::raster::RasterError;
use crate::remote::RemoteError;

/// Failure of a single work-item attempt (any of the composite request,
/// URL issuance, HTTP fetch, persist, or tagging steps).
#[derive(Debug)]
pub enum FetchError {
    /// The compute service rejected or failed a request.
    Remote(RemoteError),
    /// Transport error fetching the download URL.
    Curl(curl::Error),
    /// Non-2xx HTTP status fetching the download URL.
    Http(u32),
    /// Filesystem write failed.
    Storage(std::io::Error),
    /// Band tagging on the persisted artifact failed.
    Raster(RasterError),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Remote(e) => write!(f, "{}", e),
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::Storage(e) => write!(f, "storage: {}", e),
            FetchError::Raster(e) => write!(f, "band tagging: {}", e),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Remote(e) => Some(e),
            FetchError::Curl(e) => Some(e),
            FetchError::Storage(e) => Some(e),
            FetchError::Raster(e) => Some(e),
            FetchError::Http(_) => None,
        }
    }
}

impl From<RemoteError> for FetchError {
    fn from(e: RemoteError) -> Self {
        FetchError::Remote(e)
    }
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        FetchError::Curl(e)
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Storage(e)
    }
}

impl From<RasterError> for FetchError {
    fn from(e: RasterError) -> Self {
        FetchError::Raster(e)
    }
}
