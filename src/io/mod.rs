//! Input/output helpers.
//!
//! - per-series CSV ingest + validation (`ingest`)
//! - series and enriched-table CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
