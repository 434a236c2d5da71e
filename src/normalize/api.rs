use chrono::{DateTime, SecondsFormat};
use serde_json::Value;

use super::layout::{
    FieldPath, ACTIVITY_COUNTS_PATH, ACTIVITY_URN, AUTHOR_PATHS, AUTHOR_PROFILE_PATHS,
    CONTENT_PATHS, ID_PATHS, IMAGES_PATH, PUBLISHED_PATHS, SAVED_AT_PATHS, URL_PATHS, VIDEO_PATH,
};
use super::{or_not_available, permalink_for_urn, strip_see_more, IdMinter};
use crate::candidates::{first_match, first_non_empty};
use crate::models::{
    Engagement, ExtractionMethod, IdSource, Media, MediaKind, SavedPost, NOT_AVAILABLE,
};

/// Normalize one item from an API response envelope.
///
/// Returns `None` for non-objects and for items where none of author,
/// content or url resolve.
pub fn normalize_api_item(item: &Value, ids: &mut IdMinter) -> Option<SavedPost> {
    if !item.is_object() {
        return None;
    }

    let content = first_non_empty(CONTENT_PATHS, |p| text_at(item, *p))
        .map(|c| strip_see_more(&c))
        .filter(|c| !c.is_empty());
    let author = first_non_empty(AUTHOR_PATHS, |p| text_at(item, *p));
    let urn = first_non_empty(ID_PATHS, |p| text_at(item, *p));
    let url = first_non_empty(URL_PATHS, |p| text_at(item, *p)).or_else(|| {
        urn.as_deref()
            .and_then(|u| ACTIVITY_URN.find(u))
            .map(|m| permalink_for_urn(m.as_str()))
    });

    if author.is_none() && content.is_none() && url.is_none() {
        return None;
    }

    let author = or_not_available(author.as_ref());
    let content = or_not_available(content.as_ref());
    let url = or_not_available(url.as_ref());
    let (id, id_source) = match urn {
        Some(urn) => (urn, IdSource::Urn),
        None => (
            ids.mint(ExtractionMethod::Api, &author, &content, &url),
            IdSource::Synthesized,
        ),
    };

    Some(SavedPost {
        id,
        id_source,
        author,
        content,
        url,
        timestamp: first_match(PUBLISHED_PATHS, |p| time_at(item, *p))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        extraction_method: ExtractionMethod::Api,
        author_profile: first_non_empty(AUTHOR_PROFILE_PATHS, |p| text_at(item, *p)),
        saved_at: first_match(SAVED_AT_PATHS, |p| time_at(item, *p)),
        media: Some(media(item)),
        engagement: engagement(item),
    })
}

fn lookup<'a>(item: &'a Value, path: FieldPath) -> Option<&'a Value> {
    path.iter().try_fold(item, |node, key| node.get(key))
}

/// A text field is either a plain string or a `{ "text": ... }` view model.
fn text_at(item: &Value, path: FieldPath) -> Option<String> {
    match lookup(item, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("text").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// Epoch milliseconds become ISO-8601; strings pass through untouched.
fn time_at(item: &Value, path: FieldPath) -> Option<String> {
    match lookup(item, path)? {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn media(item: &Value) -> Media {
    let has_image = lookup(item, IMAGES_PATH)
        .and_then(Value::as_array)
        .is_some_and(|images| !images.is_empty());
    let has_video = lookup(item, VIDEO_PATH).is_some_and(|v| !v.is_null());
    let kind = if has_video {
        MediaKind::Video
    } else if has_image {
        MediaKind::Image
    } else {
        MediaKind::Text
    };
    Media {
        kind,
        has_image,
        has_video,
    }
}

fn engagement(item: &Value) -> Option<Engagement> {
    let counts = lookup(item, ACTIVITY_COUNTS_PATH)?.as_object()?;
    let count = |key: &str| counts.get(key).and_then(Value::as_u64).unwrap_or(0);
    Some(Engagement {
        likes: count("numLikes"),
        comments: count("numComments"),
        shares: count("numShares"),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn normalize(item: &Value) -> Option<SavedPost> {
        normalize_api_item(item, &mut IdMinter::new())
    }

    #[test]
    fn test_full_item() {
        let item = json!({
            "entityUrn": "urn:li:fsd_savedItem:(urn:li:activity:9,1)",
            "summary": { "text": "Rust 2024 is out" },
            "navigationUrl": "https://www.linkedin.com/feed/update/urn:li:activity:9/",
            "actor": { "name": { "text": "Ferris" }, "navigationUrl": "https://www.linkedin.com/in/ferris" },
            "createdAt": 1_704_067_200_000_i64,
            "savedAt": 1_704_153_600_000_i64,
            "content": { "images": [{ "url": "a.png" }] },
            "socialDetail": { "totalSocialActivityCounts": { "numLikes": 12, "numComments": 3 } }
        });

        let post = normalize(&item).unwrap();
        assert_eq!(post.id, "urn:li:fsd_savedItem:(urn:li:activity:9,1)");
        assert_eq!(post.id_source, IdSource::Urn);
        assert_eq!(post.content, "Rust 2024 is out");
        assert_eq!(post.author, "Ferris");
        assert_eq!(post.timestamp, "2024-01-01T00:00:00.000Z");
        assert_eq!(post.saved_at.as_deref(), Some("2024-01-02T00:00:00.000Z"));
        assert_eq!(
            post.author_profile.as_deref(),
            Some("https://www.linkedin.com/in/ferris")
        );
        assert_eq!(post.media.as_ref().unwrap().kind, MediaKind::Image);
        assert_eq!(
            post.engagement,
            Some(Engagement {
                likes: 12,
                comments: 3,
                shares: 0
            })
        );
        assert_eq!(post.extraction_method, ExtractionMethod::Api);
    }

    #[test]
    fn test_content_path_priority() {
        let item = json!({ "text": "plain", "commentary": { "text": "commentary" } });
        assert_eq!(normalize(&item).unwrap().content, "plain");

        let item = json!({ "commentary": { "text": "commentary" } });
        assert_eq!(normalize(&item).unwrap().content, "commentary");
    }

    #[test]
    fn test_url_derived_from_activity_urn() {
        let item = json!({ "trackingUrn": "urn:li:activity:77", "text": "x" });
        let post = normalize(&item).unwrap();
        assert_eq!(post.id, "urn:li:activity:77");
        assert_eq!(
            post.url,
            "https://www.linkedin.com/feed/update/urn:li:activity:77/"
        );
    }

    #[test]
    fn test_missing_fields_degrade_to_sentinel() {
        let item = json!({ "author": { "name": "Only Author" }, "createdAt": "yesterday" });
        let post = normalize(&item).unwrap();
        assert_eq!(post.author, "Only Author");
        assert_eq!(post.content, NOT_AVAILABLE);
        assert_eq!(post.url, NOT_AVAILABLE);
        assert_eq!(post.timestamp, "yesterday");
        assert_eq!(post.id_source, IdSource::Synthesized);
        assert!(post.id.starts_with("api_0_"));
        assert_eq!(post.engagement, None);
    }

    #[test]
    fn test_malformed_items_are_rejected() {
        assert!(normalize(&json!("string")).is_none());
        assert!(normalize(&json!(null)).is_none());
        assert!(normalize(&json!({ "entityUrn": "urn:li:fs_miniProfile:1" })).is_none());
        assert!(normalize(&json!({ "summary": 5, "actor": [] })).is_none());
    }

    #[test]
    fn test_video_wins_over_image() {
        let item = json!({
            "text": "clip",
            "content": { "images": [1], "video": { "id": "v" } }
        });
        let media = normalize(&item).unwrap().media.unwrap();
        assert_eq!(media.kind, MediaKind::Video);
        assert!(media.has_image);
        assert!(media.has_video);
    }
}
