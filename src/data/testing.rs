//! In-memory transport for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::data::transport::{HttpResponse, Transport};
use crate::error::SeriesError;

/// Serves canned responses by URL and records every request.
///
/// Unregistered URLs behave like an unreachable host.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, HttpResponse>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            HttpResponse {
                status,
                body: body.to_string(),
            },
        );
    }

    pub fn respond_ok(&self, url: &str, body: &str) {
        self.respond(url, 200, body);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, SeriesError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| SeriesError::UpstreamUnavailable {
                resource: url.to_string(),
                status: None,
                body: "connection refused".to_string(),
            })
    }
}
