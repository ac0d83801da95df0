//! Error taxonomy for presence analysis.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures surfaced by the analysis core.
///
/// Every failure is detected before or during the single pass over the
/// input and reported synchronously; there is no retry or partial-result
/// path. A failed window never corrupts the analysis of other windows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// A window bound or event timestamp could not be parsed.
    #[error("malformed timestamp: {value}")]
    MalformedTimestamp { value: String },

    /// The window end was not strictly after its start.
    #[error("invalid window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}
