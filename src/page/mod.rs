//! The live page, as seen by the extraction pipeline.
//!
//! The pipeline never touches a browser directly. It reads the page through
//! [`PageContext`], which the host provides: the binary implements it for a
//! chromiumoxide page, tests implement it with scripted fixtures.

pub mod chrome;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use chrome::ChromePage;

/// A stream that yields once per observed DOM mutation batch.
pub type MutationStream = BoxStream<'static, ()>;

/// Capability to read and scroll one page context.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Serialized HTML of the current document.
    async fn html(&self) -> Result<String>;

    /// Number of elements matching a CSS selector.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Scrollable height of the first element matching `container`, or of the
    /// document element when nothing matches.
    async fn scroll_height(&self, container: &str) -> Result<u64>;

    /// Scroll the window to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Start observing subtree mutations of the document body.
    async fn mutations(&self) -> Result<MutationStream>;

    /// Disconnect the observer started by [`PageContext::mutations`].
    async fn stop_mutations(&self) -> Result<()>;

    /// Snapshot of the session state the API strategy resolves identity from.
    async fn session_state(&self) -> Result<SessionState>;
}

/// Session-scoped values read from the page, gathered once per extraction.
///
/// Every field is a raw candidate; resolution order lives in the API strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// `entityUrn` of the signed-in member's mini profile, from page globals.
    pub mini_profile_urn: Option<String>,
    /// Raw JSON stored under the current-profile local storage key.
    pub stored_profile: Option<String>,
    /// Hrefs of profile links present on the page.
    #[serde(default)]
    pub profile_links: Vec<String>,
    /// CSRF token from the `csrf-token` meta tag.
    pub csrf_meta: Option<String>,
    /// CSRF token exposed on page globals.
    pub csrf_global: Option<String>,
    /// CSRF token kept in local storage.
    pub csrf_storage: Option<String>,
    /// Cookies of the page's origin, as name/value pairs.
    #[serde(default)]
    pub cookies: Vec<(String, String)>,
}

impl SessionState {
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// `Cookie` header value carrying every session cookie.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
