//! Shared constants used across the application.

/// User agent string used for private API requests.
///
/// Matches the desktop browser the session cookies were issued to, so API calls
/// look like the page's own traffic.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Origin used to resolve relative links found in page markup.
pub const SITE_ORIGIN: &str = "https://www.linkedin.com";

/// The saved-posts page the browser is pointed at.
pub const SAVED_POSTS_URL: &str = "https://www.linkedin.com/my-items/saved-posts/";

/// Base URL of the private JSON API.
pub const VOYAGER_API_BASE: &str = "https://www.linkedin.com/voyager/api";

/// Base URL of the spreadsheet REST API.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Truncation marker appended by the source UI to collapsed post bodies.
pub const SEE_MORE_SUFFIX: &str = "\u{2026}see more";
