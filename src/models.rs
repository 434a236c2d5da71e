//! Canonical record types produced by the extraction pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel for a field that could not be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

/// Which strategy produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Api,
    Dom,
}

impl ExtractionMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Dom => "dom",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a record's `id` came from.
///
/// Synthesized ids are unique within one run but carry no identity across
/// runs, so deduplication keys them by url instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdSource {
    Urn,
    Synthesized,
}

/// Kind of media attached to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Text,
    Image,
    Video,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub kind: MediaKind,
    pub has_image: bool,
    pub has_video: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

/// A single saved post.
///
/// `author`, `content`, `url` and `timestamp` are never empty; unresolved
/// fields carry [`NOT_AVAILABLE`]. The optional enrichment fields are only
/// filled by the API strategy and are omitted from serialized output when
/// unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPost {
    pub id: String,
    #[serde(skip_serializing, default = "default_id_source")]
    pub id_source: IdSource,
    pub author: String,
    pub content: String,
    pub url: String,
    /// Display-only; ISO-8601 only when the API supplied an epoch value.
    pub timestamp: String,
    pub extraction_method: ExtractionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<Engagement>,
}

fn default_id_source() -> IdSource {
    IdSource::Urn
}

impl SavedPost {
    /// Whether the url field was resolved.
    #[must_use]
    pub fn has_url(&self) -> bool {
        self.url != NOT_AVAILABLE
    }

    /// Key used to collapse duplicates: the id when it is stable, otherwise the url.
    #[must_use]
    pub fn dedup_key(&self) -> &str {
        match self.id_source {
            IdSource::Synthesized if self.has_url() => &self.url,
            _ => &self.id,
        }
    }
}

/// Final output of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub posts: Vec<SavedPost>,
    pub count: usize,
}

impl ExtractionResult {
    #[must_use]
    pub fn new(posts: Vec<SavedPost>) -> Self {
        let count = posts.len();
        Self { posts, count }
    }

    /// Zero records. Callers present this as "nothing found"; it is not an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, source: IdSource, url: &str) -> SavedPost {
        SavedPost {
            id: id.to_string(),
            id_source: source,
            author: "Ada".to_string(),
            content: "Hello".to_string(),
            url: url.to_string(),
            timestamp: NOT_AVAILABLE.to_string(),
            extraction_method: ExtractionMethod::Dom,
            author_profile: None,
            saved_at: None,
            media: None,
            engagement: None,
        }
    }

    #[test]
    fn test_dedup_key_prefers_stable_id() {
        let p = post("urn:li:activity:1", IdSource::Urn, "https://x/1");
        assert_eq!(p.dedup_key(), "urn:li:activity:1");
    }

    #[test]
    fn test_dedup_key_synthesized_uses_url() {
        let p = post("dom_0_abc", IdSource::Synthesized, "https://x/1");
        assert_eq!(p.dedup_key(), "https://x/1");

        let no_url = post("dom_1_abc", IdSource::Synthesized, NOT_AVAILABLE);
        assert_eq!(no_url.dedup_key(), "dom_1_abc");
    }

    #[test]
    fn test_serialized_field_names() {
        let p = post("urn:li:activity:1", IdSource::Urn, "https://x/1");
        let json = serde_json::to_value(&p).unwrap();

        assert_eq!(json["author"], "Ada");
        assert_eq!(json["content"], "Hello");
        assert_eq!(json["timestamp"], "N/A");
        assert_eq!(json["url"], "https://x/1");
        assert_eq!(json["extractionMethod"], "dom");
        assert!(json.get("engagement").is_none());
        assert!(json.get("idSource").is_none());
    }

    #[test]
    fn test_result_count() {
        let result = ExtractionResult::new(vec![post("a", IdSource::Urn, "u")]);
        assert_eq!(result.count, 1);
        assert!(!result.is_empty());
        assert!(ExtractionResult::default().is_empty());
    }
}
