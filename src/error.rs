use thiserror::Error;

use crate::domain::SeriesKey;

/// Exit code for caller/input mistakes (bad flags, unreadable files).
pub const EXIT_INPUT: u8 = 2;
/// Exit code for upstream/data failures.
pub const EXIT_DATA: u8 = 4;
/// Exit code for a cancelled run (mirrors SIGINT convention).
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors raised by the retrieval and assembly pipeline.
///
/// Leaf failures (`UpstreamUnavailable`, `MalformedPayload`) are absorbed by the
/// assembler as gaps; everything else propagates to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// Unknown series identifier, region or resolution (or another caller-side mistake).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The remote answered with a non-success status, or could not be reached at all.
    #[error("Upstream unavailable for {resource}{}: {body}", fmt_status(.status))]
    UpstreamUnavailable {
        resource: String,
        status: Option<u16>,
        body: String,
    },

    /// The response body did not match the expected JSON shape.
    #[error("Malformed payload for {resource}: {reason}")]
    MalformedPayload { resource: String, reason: String },

    /// The index could not be resolved, or every chunk failed.
    #[error("Series {key} unavailable: {reason}")]
    SeriesUnavailable { key: SeriesKey, reason: String },

    /// Alignment was asked to join zero series.
    #[error("Cannot align an empty set of series")]
    EmptyInput,

    /// The reference timezone is not a known IANA zone identifier.
    #[error("Invalid timezone '{0}'")]
    InvalidTimezone(String),

    /// Assembly was cancelled between chunk fetches.
    #[error("Assembly of {key} cancelled after {fetched} of {total} chunks")]
    Cancelled {
        key: SeriesKey,
        fetched: usize,
        total: usize,
    },
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl SeriesError {
    /// Leaf failures that the assembler turns into gaps instead of aborting.
    pub fn is_chunk_level(&self) -> bool {
        matches!(
            self,
            SeriesError::UpstreamUnavailable { .. } | SeriesError::MalformedPayload { .. }
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            SeriesError::InvalidParameter(_) | SeriesError::EmptyInput | SeriesError::InvalidTimezone(_) => {
                EXIT_INPUT
            }
            SeriesError::UpstreamUnavailable { .. }
            | SeriesError::MalformedPayload { .. }
            | SeriesError::SeriesUnavailable { .. } => EXIT_DATA,
            SeriesError::Cancelled { .. } => EXIT_CANCELLED,
        }
    }
}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}
