//! Stitch all chunks of one series into a single gap-aware timeline.
//!
//! Pipeline per series:
//! index -> fetch every token (sequentially or on a bounded pool) -> merge in
//! token order -> strictly increasing `AssembledSeries`.
//!
//! A failing chunk becomes a recorded gap. Only "no index" and "no chunk at all"
//! fail the series.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::data::{SmardClient, Transport};
use crate::domain::{
    AssembledSeries, ChunkFailureKind, PaginationToken, RawPoint, SeriesChunk, SeriesKey, SkippedChunk,
};
use crate::error::SeriesError;

/// Cooperative cancellation flag, checked once before every chunk fetch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of fetching one token.
pub type ChunkOutcome = (PaginationToken, Result<SeriesChunk, SeriesError>);

pub struct SeriesAssembler<'a, T> {
    client: &'a SmardClient<T>,
    workers: usize,
    cancel: CancelToken,
}

impl<'a, T: Transport> SeriesAssembler<'a, T> {
    pub fn new(client: &'a SmardClient<T>) -> Self {
        Self {
            client,
            workers: 1,
            cancel: CancelToken::default(),
        }
    }

    /// Fetch up to `workers` chunks concurrently. `1` (the default) is sequential.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn assemble(&self, key: SeriesKey) -> Result<AssembledSeries, SeriesError> {
        let tokens = self.client.resolve_index(&key).map_err(|err| SeriesError::SeriesUnavailable {
            key,
            reason: format!("index could not be resolved: {err}"),
        })?;

        if tokens.is_empty() {
            tracing::info!(%key, "index is empty, nothing published yet");
            return Ok(AssembledSeries::empty(key));
        }

        // Tokens are opaque; only their order matters.
        let mut tokens = tokens;
        tokens.sort_unstable();
        tokens.dedup();

        let outcomes = if self.workers > 1 {
            self.fetch_parallel(&key, &tokens)?
        } else {
            self.fetch_sequential(&key, &tokens)?
        };

        let series = merge_chunks(key, outcomes)?;
        tracing::info!(
            %key,
            points = series.len(),
            nulls = series.null_count(),
            skipped = series.skipped().len(),
            "assembled series"
        );
        Ok(series)
    }

    fn fetch_sequential(&self, key: &SeriesKey, tokens: &[PaginationToken]) -> Result<Vec<ChunkOutcome>, SeriesError> {
        let mut outcomes = Vec::with_capacity(tokens.len());
        for (fetched, &token) in tokens.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(SeriesError::Cancelled {
                    key: *key,
                    fetched,
                    total: tokens.len(),
                });
            }
            outcomes.push((token, self.client.fetch_chunk(key, token)));
        }
        Ok(outcomes)
    }

    fn fetch_parallel(&self, key: &SeriesKey, tokens: &[PaginationToken]) -> Result<Vec<ChunkOutcome>, SeriesError> {
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(error = %e, "failed to start fetch pool, fetching sequentially");
                return self.fetch_sequential(key, tokens);
            }
        };

        // `collect` on an indexed parallel iterator keeps input (token) order.
        let outcomes: Vec<Option<ChunkOutcome>> = pool.install(|| {
            tokens
                .par_iter()
                .map(|&token| {
                    if self.cancel.is_cancelled() {
                        None
                    } else {
                        Some((token, self.client.fetch_chunk(key, token)))
                    }
                })
                .collect()
        });

        if outcomes.iter().any(Option::is_none) {
            return Err(SeriesError::Cancelled {
                key: *key,
                fetched: outcomes.iter().filter(|o| o.is_some()).count(),
                total: tokens.len(),
            });
        }
        Ok(outcomes.into_iter().flatten().collect())
    }
}

/// Merge fetched chunks into one series.
///
/// Chunks are applied in ascending token order regardless of input order, so on
/// overlapping instants the chunk with the higher token wins. Chunk-level
/// failures are recorded as skipped; if none succeeded the series is unavailable.
pub fn merge_chunks(key: SeriesKey, mut outcomes: Vec<ChunkOutcome>) -> Result<AssembledSeries, SeriesError> {
    outcomes.sort_by_key(|(token, _)| *token);

    let total = outcomes.len();
    let mut merged: BTreeMap<DateTime<Utc>, Option<f64>> = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut succeeded = 0usize;
    let mut last_error = None;

    for (token, outcome) in outcomes {
        match outcome {
            Ok(chunk) => {
                succeeded += 1;
                for point in chunk.points {
                    merged.insert(point.timestamp, point.value);
                }
            }
            Err(err @ SeriesError::UpstreamUnavailable { .. }) => {
                tracing::warn!(%key, %token, error = %err, "chunk unavailable, leaving gap");
                skipped.push(SkippedChunk {
                    token,
                    kind: ChunkFailureKind::Upstream,
                    reason: err.to_string(),
                });
                last_error = Some(err);
            }
            Err(err @ SeriesError::MalformedPayload { .. }) => {
                tracing::warn!(%key, %token, error = %err, "malformed chunk payload, leaving gap");
                skipped.push(SkippedChunk {
                    token,
                    kind: ChunkFailureKind::Malformed,
                    reason: err.to_string(),
                });
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    if total > 0 && succeeded == 0 {
        let cause = last_error.map(|e| e.to_string()).unwrap_or_default();
        return Err(SeriesError::SeriesUnavailable {
            key,
            reason: format!("all {total} chunks failed (last: {cause})"),
        });
    }

    let points: Vec<RawPoint> = merged
        .into_iter()
        .map(|(timestamp, value)| RawPoint::new(timestamp, value))
        .collect();

    // BTreeMap keys are unique and sorted; `new` re-checks strict monotonicity.
    AssembledSeries::new(key, points, skipped)
}
