//! The two interchangeable extraction strategies.
//!
//! Both produce `SavedPost` sequences in page/response order; the
//! orchestrator decides which one runs.

pub mod api;
pub mod dom;

pub use api::{ApiConfig, ApiContext, ApiStrategy};
pub use dom::extract_from_dom;
