//! Series assembly, alignment and calendar enrichment.

pub mod align;
pub mod assembler;
pub mod calendar;

pub use align::align;
pub use assembler::{CancelToken, SeriesAssembler, merge_chunks};
pub use calendar::{CalendarEnricher, enrich};
