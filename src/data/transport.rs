//! The HTTP capability injected into the SMARD client.
//!
//! The client only ever needs "GET this URL, give me status + body", so that is
//! the whole seam. Production uses [`HttpTransport`] (blocking reqwest with a
//! per-request timeout); tests substitute an in-memory map.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{AppError, EXIT_DATA, EXIT_INPUT, SeriesError};

/// Raw response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET. Must be shareable across the fetch worker pool.
pub trait Transport: Send + Sync {
    /// Transport-level failures (DNS, connect, timeout) are reported as
    /// `SeriesError::UpstreamUnavailable` with `status: None`.
    fn get(&self, url: &str) -> Result<HttpResponse, SeriesError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<HttpResponse, SeriesError> {
        (**self).get(url)
    }
}

/// reqwest-backed transport. The inner client pools connections.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        if timeout.is_zero() {
            return Err(AppError::new(EXIT_INPUT, "Request timeout must be > 0 seconds."));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("smard-series/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::new(EXIT_DATA, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, SeriesError> {
        tracing::debug!(url, "GET");
        let resp = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .map_err(|e| SeriesError::UpstreamUnavailable {
                resource: url.to_string(),
                status: e.status().map(|s| s.as_u16()),
                body: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| SeriesError::UpstreamUnavailable {
            resource: url.to_string(),
            status: Some(status),
            body: format!("failed to read response body: {e}"),
        })?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpResponse::ok("{}").is_success());
        assert!(
            !HttpResponse {
                status: 404,
                body: String::new()
            }
            .is_success()
        );
        assert!(
            !HttpResponse {
                status: 301,
                body: String::new()
            }
            .is_success()
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(HttpTransport::new(Duration::ZERO).is_err());
    }
}
