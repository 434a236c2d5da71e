//! Saved post extractor library.
//!
//! Pulls a user's saved posts out of a logged-in browser session, first via
//! the site's internal paginated API and, failing that, by incrementally
//! loading and scraping the rendered list. Results are normalized into one
//! record shape, deduplicated, and optionally exported to a spreadsheet.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod candidates;
pub mod chromium_profile;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod error;
pub mod export;
pub mod fs_utils;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod page;
pub mod strategy;

pub use error::ExtractError;
pub use models::{ExtractionMethod, ExtractionResult, SavedPost};
pub use orchestrator::Extractor;
