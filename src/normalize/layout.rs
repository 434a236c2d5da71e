//! Site layout tables: container selectors, per-field selectors and JSON field paths.
//!
//! Every list is in priority order. The current saved-posts layout comes
//! first; older search-result and feed layouts follow.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;

/// Post container selectors. The first one that matches anything wins;
/// later entries are ignored for that page.
pub const POST_CONTAINERS: &[&str] = &[
    "li.reusable-search__result-container",
    "div[data-chameleon-result-urn]",
    "[data-test-id=\"saved-item\"]",
    ".saved-item",
    ".feed-shared-update-v2",
    ".occludable-update",
    "[data-urn*=\"savedItem\"]",
];

/// Scrollable wrapper whose height grows as more posts load.
pub const SCROLL_CONTAINER: &str = "div.scaffold-finite-scroll__content";

/// Attributes carrying an entity URN, on the container or a descendant.
pub const URN_ATTRIBUTES: &[&str] = &["data-chameleon-result-urn", "data-urn"];

/// Separator between the visible fields of a result subtitle.
pub const BULLET: char = '\u{2022}';

pub static POST_CONTAINER_SELECTORS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| POST_CONTAINERS.iter().map(|css| compile(css)).collect());

pub static URN_SELECTORS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    URN_ATTRIBUTES
        .iter()
        .map(|attr| (*attr, compile(&format!("[{attr}]"))))
        .collect()
});

pub static ACTIVITY_URN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"urn:li:activity:\d+").unwrap());

/// How a field is read from a container element.
#[derive(Debug)]
pub enum DomRule {
    /// Whole text of the first match.
    Text(Selector),
    /// Text of the first match, cut at the first bullet.
    BeforeBullet(Selector),
    /// Text before the first bullet, only when a bullet is present.
    BulletPrefix(Selector),
    /// `href` of the first match.
    Href(Selector),
}

pub static AUTHOR_RULES: LazyLock<Vec<DomRule>> = LazyLock::new(|| {
    vec![
        DomRule::Text(compile("div.entity-result__content-actor a")),
        DomRule::BeforeBullet(compile("div.entity-result__primary-subtitle")),
        DomRule::Text(compile(".update-components-actor__name")),
        DomRule::Text(compile(".feed-shared-actor__name")),
    ]
});

pub static CONTENT_RULES: LazyLock<Vec<DomRule>> = LazyLock::new(|| {
    vec![
        DomRule::Text(compile("p.entity-result__content-summary")),
        DomRule::Text(compile("div.entity-result__summary")),
        DomRule::Text(compile(".feed-shared-text__text-view")),
        DomRule::Text(compile(".attributed-text-segment-list__content")),
        DomRule::Text(compile(".break-words")),
    ]
});

pub static URL_RULES: LazyLock<Vec<DomRule>> = LazyLock::new(|| {
    vec![
        DomRule::Href(compile("a[href*=\"/feed/update/urn:li:activity:\"]")),
        DomRule::Href(compile("a[href*=\"/posts/\"]")),
        DomRule::Href(compile("a[href*=\"/feed/update/\"]")),
    ]
});

pub static TIMESTAMP_RULES: LazyLock<Vec<DomRule>> =
    LazyLock::new(|| vec![DomRule::BulletPrefix(compile("p.t-12.t-black--light"))]);

/// A JSON path into an API item, one key per level.
pub type FieldPath = &'static [&'static str];

pub const ID_PATHS: &[FieldPath] = &[&["entityUrn"], &["trackingUrn"]];
pub const CONTENT_PATHS: &[FieldPath] = &[&["summary", "text"], &["text"], &["commentary", "text"]];
pub const URL_PATHS: &[FieldPath] = &[&["navigationUrl"], &["permalink"], &["shareUrl"]];
pub const AUTHOR_PATHS: &[FieldPath] = &[&["actor", "name"], &["author", "name"]];
pub const AUTHOR_PROFILE_PATHS: &[FieldPath] =
    &[&["actor", "navigationUrl"], &["author", "profileUrl"]];
pub const PUBLISHED_PATHS: &[FieldPath] = &[&["createdAt"], &["publishedAt"]];
pub const SAVED_AT_PATHS: &[FieldPath] = &[&["savedAt"]];
pub const IMAGES_PATH: FieldPath = &["content", "images"];
pub const VIDEO_PATH: FieldPath = &["content", "video"];
pub const ACTIVITY_COUNTS_PATH: FieldPath = &["socialDetail", "totalSocialActivityCounts"];

/// Substrings that mark an `included` entity as a post-like item.
pub const INCLUDED_URN_MARKERS: &[&str] = &["savedItem", "post", "share"];

fn compile(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_selectors_compile() {
        assert_eq!(POST_CONTAINER_SELECTORS.len(), POST_CONTAINERS.len());
        assert_eq!(URN_SELECTORS.len(), URN_ATTRIBUTES.len());
        assert!(!AUTHOR_RULES.is_empty());
        assert!(!CONTENT_RULES.is_empty());
        assert!(!URL_RULES.is_empty());
        assert!(!TIMESTAMP_RULES.is_empty());
    }

    #[test]
    fn test_activity_urn_pattern() {
        let found = ACTIVITY_URN
            .find("https://www.linkedin.com/feed/update/urn:li:activity:7100/?x=1")
            .map(|m| m.as_str());
        assert_eq!(found, Some("urn:li:activity:7100"));
    }
}
