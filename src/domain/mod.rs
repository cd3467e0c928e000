//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed catalog of series, regions and resolutions (`catalog`)
//! - request keys and pagination tokens (`SeriesKey`, `PaginationToken`)
//! - pipeline values (`SeriesChunk`, `AssembledSeries`, `WideTable`, `EnrichedRow`)
//! - resolved run configuration (`DownloadConfig`, `TableConfig`)

pub mod catalog;
pub mod types;

pub use types::*;
