//! Field Normalizer.
//!
//! Maps a raw page element or a raw API object onto the canonical
//! [`SavedPost`](crate::models::SavedPost). Every layout-specific selector and
//! JSON field path lives in [`layout`]; the rest of the crate never names one.
//!
//! Normalization never fails loudly: a field that cannot be resolved degrades
//! to [`NOT_AVAILABLE`](crate::models::NOT_AVAILABLE), and an input where none
//! of author, content or url resolve yields `None` ("not a real post").

mod api;
mod dom;
mod ids;
pub mod layout;

pub use api::normalize_api_item;
pub use dom::normalize_element;
pub use ids::IdMinter;

use crate::constants::SEE_MORE_SUFFIX;
use crate::models::NOT_AVAILABLE;

/// Remove the UI's trailing "…see more" marker, then trim.
///
/// Text without the marker is returned unchanged.
#[must_use]
pub fn strip_see_more(text: &str) -> String {
    text.strip_suffix(SEE_MORE_SUFFIX)
        .map_or_else(|| text.to_string(), |rest| rest.trim().to_string())
}

/// Collapse runs of whitespace (including the line breaks the renderer inserts
/// between text nodes) into single spaces.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn or_not_available(value: Option<&String>) -> String {
    value.cloned().unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Permalink for an activity URN.
pub(crate) fn permalink_for_urn(urn: &str) -> String {
    format!("{}/feed/update/{urn}/", crate::constants::SITE_ORIGIN)
}
