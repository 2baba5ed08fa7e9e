//! Shared HTTP client construction policy.
//!
//! Search transports, PDF locators, and the download client all go through
//! [`build_http_client`] so they agree on timeouts, compression, and user
//! agent. Proxies come from the standard `HTTP(S)_PROXY`/`NO_PROXY` variables.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::user_agent;

/// Default connect timeout for every provider call.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default end-to-end timeout for every provider call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeouts applied to every network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Connect timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds (includes streaming the body).
    pub request_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl HttpTimeouts {
    /// Uses the same value for connect and request timeouts.
    #[must_use]
    pub fn uniform(secs: u64) -> Self {
        Self {
            connect_secs: secs,
            request_secs: secs,
        }
    }
}

/// Builds a `reqwest` client using the shared project policy.
///
/// # Errors
///
/// Returns the underlying `reqwest` error when the TLS backend cannot be
/// initialized.
pub fn build_http_client(timeouts: HttpTimeouts) -> Result<Client, reqwest::Error> {
    debug!(
        connect_secs = timeouts.connect_secs,
        request_secs = timeouts.request_secs,
        "building HTTP client"
    );
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.request_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts_are_thirty_seconds() {
        let timeouts = HttpTimeouts::default();
        assert_eq!(timeouts.connect_secs, 30);
        assert_eq!(timeouts.request_secs, 30);
    }

    #[test]
    fn test_uniform_timeouts() {
        assert_eq!(
            HttpTimeouts::uniform(5),
            HttpTimeouts {
                connect_secs: 5,
                request_secs: 5
            }
        );
    }

    #[test]
    fn test_build_http_client_succeeds_with_defaults() {
        assert!(build_http_client(HttpTimeouts::default()).is_ok());
    }
}
