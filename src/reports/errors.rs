//! Report error types.

use crate::client::ClientError;
use thiserror::Error;

/// Maximum number of payload characters carried in a parse error.
pub const SNIPPET_LIMIT: usize = 500;

/// Errors that can occur while requesting or parsing OLAP reports.
///
/// Parse errors carry the start of the offending payload so a malformed
/// server response can be diagnosed without repeating the request.
///
/// # Example
///
/// ```rust
/// use iiko_api::reports::ReportError;
///
/// let error = ReportError::InvalidDateRange {
///     from: "2026-02-01T00:00:00".to_string(),
///     to: "2026-01-01T00:00:00".to_string(),
/// };
/// assert!(error.to_string().contains("2026-02-01T00:00:00"));
/// ```
#[derive(Debug, Error)]
pub enum ReportError {
    /// The payload is not valid JSON.
    #[error("Failed to parse JSON response: {message}")]
    InvalidJson {
        /// The parser's description of the problem.
        message: String,
        /// The first characters of the payload.
        snippet: String,
    },

    /// The payload is not well-formed XML.
    #[error("Failed to parse XML response at byte {position}: {message}")]
    InvalidXml {
        /// The parser's description of the problem.
        message: String,
        /// Byte offset at which parsing stopped.
        position: u64,
        /// The first characters of the payload.
        snippet: String,
    },

    /// The payload is well-formed but not shaped as expected.
    #[error("Unexpected response payload: {reason}")]
    UnexpectedPayload {
        /// What was wrong with the payload.
        reason: String,
    },

    /// Chunked reports need both a start and an end date.
    #[error("A chunked report requires both date_from and date_to")]
    MissingDateRange,

    /// The end of the date range is before its start.
    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange {
        /// Range start as given.
        from: String,
        /// Range end as given.
        to: String,
    },

    /// The request failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl From<crate::clients::HttpError> for ReportError {
    fn from(error: crate::clients::HttpError) -> Self {
        Self::Client(ClientError::Http(error))
    }
}
