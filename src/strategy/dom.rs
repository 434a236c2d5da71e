//! DOM Extraction Strategy.

use scraper::{ElementRef, Html};
use tracing::{debug, info};

use crate::candidates::first_match;
use crate::models::SavedPost;
use crate::normalize::layout::{POST_CONTAINERS, POST_CONTAINER_SELECTORS};
use crate::normalize::{normalize_element, IdMinter};

/// Extract every post from a fully loaded page snapshot.
///
/// Uses the first container selector that matches at least one element;
/// layouts are never mixed within one call. Containers that do not normalize
/// are skipped. No matching containers yields an empty sequence.
#[must_use]
pub fn extract_from_dom(html: &str, ids: &mut IdMinter) -> Vec<SavedPost> {
    let document = Html::parse_document(html);

    let matched = first_match(
        POST_CONTAINERS.iter().zip(POST_CONTAINER_SELECTORS.iter()),
        |(css, selector)| {
            let found: Vec<ElementRef<'_>> = document.select(selector).collect();
            (!found.is_empty()).then_some((*css, found))
        },
    );

    let Some((layout, containers)) = matched else {
        debug!("No post containers matched any layout");
        return Vec::new();
    };

    let total = containers.len();
    let posts: Vec<SavedPost> = containers
        .into_iter()
        .filter_map(|el| normalize_element(el, ids))
        .collect();

    info!(
        layout,
        containers = total,
        posts = posts.len(),
        skipped = total - posts.len(),
        "DOM extraction complete"
    );
    posts
}
