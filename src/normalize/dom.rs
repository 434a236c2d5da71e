use scraper::ElementRef;
use url::Url;

use super::layout::{
    DomRule, ACTIVITY_URN, AUTHOR_RULES, BULLET, CONTENT_RULES, TIMESTAMP_RULES, URL_RULES,
    URN_SELECTORS,
};
use super::{collapse_whitespace, or_not_available, permalink_for_urn, strip_see_more, IdMinter};
use crate::candidates::{first_match, first_non_empty};
use crate::constants::SITE_ORIGIN;
use crate::models::{ExtractionMethod, IdSource, SavedPost, NOT_AVAILABLE};

impl DomRule {
    /// Read this rule's value from `root`, if its selector matches.
    fn read(&self, root: ElementRef<'_>) -> Option<String> {
        match self {
            Self::Text(sel) => root.select(sel).next().map(element_text),
            Self::BeforeBullet(sel) => root
                .select(sel)
                .next()
                .map(|el| before_bullet(&element_text(el))),
            Self::BulletPrefix(sel) => root.select(sel).next().and_then(|el| {
                let text = element_text(el);
                text.contains(BULLET).then(|| before_bullet(&text))
            }),
            Self::Href(sel) => root
                .select(sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .map(absolute_url),
        }
    }
}

/// Normalize one post container into a record.
///
/// Returns `None` when none of author, content or url could be resolved.
pub fn normalize_element(element: ElementRef<'_>, ids: &mut IdMinter) -> Option<SavedPost> {
    let author = first_non_empty(AUTHOR_RULES.iter(), |r| r.read(element));
    let content = first_non_empty(CONTENT_RULES.iter(), |r| r.read(element))
        .map(|c| strip_see_more(&c))
        .filter(|c| !c.is_empty());
    let urn = container_urn(element);
    let url = first_non_empty(URL_RULES.iter(), |r| r.read(element))
        .or_else(|| urn.as_deref().map(permalink_for_urn));

    if author.is_none() && content.is_none() && url.is_none() {
        return None;
    }

    let timestamp = first_non_empty(TIMESTAMP_RULES.iter(), |r| r.read(element));
    let urn = urn.or_else(|| {
        url.as_deref()
            .and_then(|u| ACTIVITY_URN.find(u))
            .map(|m| m.as_str().to_string())
    });

    let author = or_not_available(author.as_ref());
    let content = or_not_available(content.as_ref());
    let url = or_not_available(url.as_ref());
    let (id, id_source) = match urn {
        Some(urn) => (urn, IdSource::Urn),
        None => (
            ids.mint(ExtractionMethod::Dom, &author, &content, &url),
            IdSource::Synthesized,
        ),
    };

    Some(SavedPost {
        id,
        id_source,
        author,
        content,
        url,
        timestamp: timestamp.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        extraction_method: ExtractionMethod::Dom,
        author_profile: None,
        saved_at: None,
        media: None,
        engagement: None,
    })
}

/// URN carried by the container itself or its first annotated descendant.
fn container_urn(element: ElementRef<'_>) -> Option<String> {
    first_match(URN_SELECTORS.iter(), |(attr, sel)| {
        element
            .value()
            .attr(attr)
            .or_else(|| {
                element
                    .select(sel)
                    .next()
                    .and_then(|el| el.value().attr(attr))
            })
            .map(str::trim)
            .filter(|urn| !urn.is_empty())
            .map(ToString::to_string)
    })
}

/// Rendered-style text: inline nodes are concatenated as-is, so markup inside a
/// word (mentions, bold runs, a split "…see more") does not introduce spaces.
fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn before_bullet(text: &str) -> String {
    text.split(BULLET).next().unwrap_or_default().trim().to_string()
}

/// Resolve an `href` against the site origin, keeping it verbatim if it cannot be parsed.
fn absolute_url(href: &str) -> String {
    Url::parse(SITE_ORIGIN)
        .and_then(|base| base.join(href))
        .map_or_else(|_| href.to_string(), String::from)
}
