//! Maps fetch errors onto retry error kinds.
//!
//! The whole fetch sequence is retried as a unit, so almost everything is
//! transient: timeouts, connection drops, any HTTP status, service errors,
//! even a failed disk write. The one exception is bad geometry, which is
//! deterministic and never retried.

use super::error::FetchError;
use super::policy::ErrorKind;
use crate::remote::RemoteError;

pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Remote(remote) if !remote.is_transient() => ErrorKind::NonTransient,
        _ => ErrorKind::Transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_is_non_transient() {
        let e = FetchError::Remote(RemoteError::Geometry("empty ring".into()));
        assert_eq!(classify(&e), ErrorKind::NonTransient);
    }

    #[test]
    fn http_and_service_errors_are_transient() {
        assert_eq!(classify(&FetchError::Http(404)), ErrorKind::Transient);
        assert_eq!(classify(&FetchError::Http(503)), ErrorKind::Transient);
        let e = FetchError::Remote(RemoteError::Service("overloaded".into()));
        assert_eq!(classify(&e), ErrorKind::Transient);
    }

    #[test]
    fn storage_errors_are_transient() {
        let e = FetchError::Storage(std::io::Error::other("disk hiccup"));
        assert_eq!(classify(&e), ErrorKind::Transient);
    }
}
