//! SMARD chart-data API integration: index resolution and chunk fetching.
//!
//! Both calls are single requests with no retry. Payloads are validated against
//! typed schemas here, so a shape mismatch surfaces immediately as
//! `SeriesError::MalformedPayload` naming the resource that produced it.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::data::transport::Transport;
use crate::domain::{PaginationToken, RawPoint, SeriesChunk, SeriesKey};
use crate::error::SeriesError;

pub const DEFAULT_BASE_URL: &str = "https://www.smard.de/app";

/// Largest body excerpt carried in an upstream error.
const ERROR_BODY_LIMIT: usize = 512;

pub struct SmardClient<T> {
    transport: T,
    base_url: String,
}

impl<T: Transport> SmardClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { transport, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn index_url(&self, key: &SeriesKey) -> String {
        format!(
            "{}/chart_data/{}/{}/index_{}.json",
            self.base_url, key.series, key.region, key.resolution
        )
    }

    pub fn chunk_url(&self, key: &SeriesKey, token: PaginationToken) -> String {
        format!(
            "{base}/chart_data/{id}/{region}/{id}_{region}_{res}_{token}.json",
            base = self.base_url,
            id = key.series,
            region = key.region,
            res = key.resolution,
        )
    }

    /// Fetch the ordered list of pagination tokens for `key`.
    ///
    /// Server order is preserved. An empty list is a valid answer ("no data yet").
    pub fn resolve_index(&self, key: &SeriesKey) -> Result<Vec<PaginationToken>, SeriesError> {
        let resource = format!("index {key}");
        let body = self.get_success(&self.index_url(key), &resource)?;

        let payload: IndexPayload = serde_json::from_str(&body).map_err(|e| SeriesError::MalformedPayload {
            resource: resource.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!(%key, tokens = payload.timestamps.len(), "resolved index");
        Ok(payload.timestamps.into_iter().map(PaginationToken).collect())
    }

    /// Fetch and parse the chunk behind one pagination token.
    pub fn fetch_chunk(&self, key: &SeriesKey, token: PaginationToken) -> Result<SeriesChunk, SeriesError> {
        let resource = format!("chunk {token} of {key}");
        let body = self.get_success(&self.chunk_url(key, token), &resource)?;
        let points = parse_chunk_body(&body).map_err(|reason| SeriesError::MalformedPayload { resource, reason })?;
        Ok(SeriesChunk { token, points })
    }

    fn get_success(&self, url: &str, resource: &str) -> Result<String, SeriesError> {
        let resp = self.transport.get(url).map_err(|err| match err {
            // Give transport failures the same resource naming as status failures.
            SeriesError::UpstreamUnavailable { status, body, .. } => SeriesError::UpstreamUnavailable {
                resource: resource.to_string(),
                status,
                body,
            },
            other => other,
        })?;

        if !resp.is_success() {
            return Err(SeriesError::UpstreamUnavailable {
                resource: resource.to_string(),
                status: Some(resp.status),
                body: truncate(&resp.body, ERROR_BODY_LIMIT),
            });
        }
        Ok(resp.body)
    }
}

#[derive(Debug, Deserialize)]
struct IndexPayload {
    timestamps: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    series: Vec<(i64, Option<f64>)>,
}

/// Parse a `{"series": [[ms, value|null], ...]}` body into points.
fn parse_chunk_body(body: &str) -> Result<Vec<RawPoint>, String> {
    let payload: ChunkPayload = serde_json::from_str(body).map_err(|e| e.to_string())?;

    payload
        .series
        .into_iter()
        .map(|(millis, value)| {
            let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| format!("timestamp {millis} ms is out of range"))?;
            Ok(RawPoint::new(timestamp, value))
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::FakeTransport;
    use crate::domain::{Region, Resolution, SeriesId};

    fn key() -> SeriesKey {
        SeriesKey::new(SeriesId::new(410).unwrap(), Region::De, Resolution::QuarterHour)
    }

    #[test]
    fn urls_follow_the_chart_data_layout() {
        let client = SmardClient::new(FakeTransport::default(), "https://example.test/app/");
        assert_eq!(
            client.index_url(&key()),
            "https://example.test/app/chart_data/410/DE/index_quarterhour.json"
        );
        assert_eq!(
            client.chunk_url(&key(), PaginationToken(1_700_000_000_000)),
            "https://example.test/app/chart_data/410/DE/410_DE_quarterhour_1700000000000.json"
        );
    }

    #[test]
    fn resolve_index_preserves_server_order() {
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        fake.respond_ok(&client.index_url(&key()), r#"{"timestamps": [300, 100, 200]}"#);

        let tokens = client.resolve_index(&key()).unwrap();
        assert_eq!(tokens, vec![PaginationToken(300), PaginationToken(100), PaginationToken(200)]);
    }

    #[test]
    fn empty_index_is_not_an_error() {
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        fake.respond_ok(&client.index_url(&key()), r#"{"timestamps": []}"#);
        assert!(client.resolve_index(&key()).unwrap().is_empty());
    }

    #[test]
    fn non_success_index_carries_status_and_body() {
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        fake.respond(&client.index_url(&key()), 503, "maintenance");

        match client.resolve_index(&key()) {
            Err(SeriesError::UpstreamUnavailable { status, body, .. }) => {
                assert_eq!(status, Some(503));
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn index_without_timestamps_is_malformed() {
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        fake.respond_ok(&client.index_url(&key()), r#"{"series": []}"#);
        assert!(matches!(
            client.resolve_index(&key()),
            Err(SeriesError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn fetch_chunk_keeps_nulls_as_missing() {
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        let token = PaginationToken(100);
        fake.respond_ok(
            &client.chunk_url(&key(), token),
            r#"{"meta_data": {"version": 1}, "series": [[1000, 5.0], [901000, null]]}"#,
        );

        let chunk = client.fetch_chunk(&key(), token).unwrap();
        assert_eq!(chunk.token, token);
        assert_eq!(chunk.points.len(), 2);
        assert_eq!(chunk.points[0].timestamp.timestamp_millis(), 1000);
        assert_eq!(chunk.points[0].value, Some(5.0));
        assert_eq!(chunk.points[1].value, None);
    }

    #[test]
    fn malformed_chunk_names_the_token() {
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        let token = PaginationToken(4242);

        for body in [
            r#"{"data": []}"#,
            r#"{"series": [["2023-01-01", 1.0]]}"#,
            r#"{"series": [[1000]]}"#,
            r#"{"series": [[1000, "high"]]}"#,
            "not json",
        ] {
            fake.respond_ok(&client.chunk_url(&key(), token), body);
            match client.fetch_chunk(&key(), token) {
                Err(SeriesError::MalformedPayload { resource, .. }) => {
                    assert!(resource.contains("4242"), "resource should name the token: {resource}");
                }
                other => panic!("expected malformed payload for {body}, got {other:?}"),
            }
        }
    }

    #[test]
    fn transport_failure_is_upstream_unavailable_without_status() {
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        // Nothing registered: the fake reports a connection failure.
        match client.fetch_chunk(&key(), PaginationToken(1)) {
            Err(SeriesError::UpstreamUnavailable { resource, status, .. }) => {
                assert_eq!(status, None);
                assert!(resource.starts_with("chunk 1 of 410/DE/quarterhour"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let long = "x".repeat(ERROR_BODY_LIMIT + 10);
        assert_eq!(truncate(&long, ERROR_BODY_LIMIT).chars().count(), ERROR_BODY_LIMIT + 1);
        assert_eq!(truncate("short", ERROR_BODY_LIMIT), "short");
    }
}
