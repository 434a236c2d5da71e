//! Error taxonomy for the extraction pipeline.

use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by the extraction pipeline.
///
/// Empty results and malformed items are not represented here: an empty run
/// returns an empty [`crate::models::ExtractionResult`], and an item that does
/// not normalize is skipped.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// First-content detection timed out (or was cancelled) before any post rendered.
    #[error("no saved posts appeared within {}s; try reloading the page", waited.as_secs())]
    NoContentAppeared { waited: Duration },

    /// The API strategy could not determine whose saved items to request.
    #[error("could not determine the current profile id")]
    IdentityUnresolved,

    /// Every candidate endpoint failed for a page.
    #[error("all API endpoints failed for page {page}: {}", failures.join("; "))]
    EndpointExhausted { page: usize, failures: Vec<String> },

    /// The host page capability failed.
    #[error("page error: {0}")]
    Page(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl ExtractError {
    pub(crate) fn page(err: &anyhow::Error) -> Self {
        Self::Page(format!("{err:#}"))
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
