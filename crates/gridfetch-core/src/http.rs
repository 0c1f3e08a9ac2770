//! Plain HTTP GET of a service-issued download URL.
//!
//! One body, one timeout, non-2xx is failure. Behind a trait so the fetch
//! worker can be exercised without a network.

use std::time::Duration;

use crate::retry::FetchError;

/// Timeout for a single artifact download.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub trait HttpClient: Send + Sync {
    /// Fetches the URL's bytes; errors on transport failure or non-2xx status.
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// libcurl-backed client used in production.
pub struct CurlClient {
    timeout: Duration,
}

impl CurlClient {
    pub fn new() -> Self {
        Self { timeout: DOWNLOAD_TIMEOUT }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for CurlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for CurlClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.timeout(self.timeout)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(body)
    }
}
