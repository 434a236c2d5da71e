//! Order-preserving deduplication of extracted posts.

use std::collections::HashSet;

use crate::models::SavedPost;

/// Drop later occurrences of the same post, keeping the first one seen.
///
/// Posts are keyed by [`SavedPost::dedup_key`]: the id when it came from a
/// URN, the url when the id was synthesized.
#[must_use]
pub fn dedup_posts(posts: Vec<SavedPost>) -> Vec<SavedPost> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| seen.insert(post.dedup_key().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionMethod, IdSource, NOT_AVAILABLE};

    fn post(id: &str, source: IdSource, url: &str, content: &str) -> SavedPost {
        SavedPost {
            id: id.to_string(),
            id_source: source,
            author: "Author".to_string(),
            content: content.to_string(),
            url: url.to_string(),
            timestamp: NOT_AVAILABLE.to_string(),
            extraction_method: ExtractionMethod::Api,
            author_profile: None,
            saved_at: None,
            media: None,
            engagement: None,
        }
    }

    #[test]
    fn test_same_id_keeps_first() {
        let posts = vec![
            post("urn:li:activity:1", IdSource::Urn, "u1", "first"),
            post("urn:li:activity:2", IdSource::Urn, "u2", "other"),
            post("urn:li:activity:1", IdSource::Urn, "u1", "second"),
        ];
        let deduped = dedup_posts(posts);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].content, "first");
        assert_eq!(deduped[1].id, "urn:li:activity:2");
    }

    #[test]
    fn test_synthesized_ids_dedup_by_url() {
        let posts = vec![
            post("dom_0_aaaa", IdSource::Synthesized, "https://x/p", "a"),
            post("dom_1_aaaa", IdSource::Synthesized, "https://x/p", "a"),
        ];
        assert_eq!(dedup_posts(posts).len(), 1);
    }

    #[test]
    fn test_synthesized_without_url_are_distinct() {
        let posts = vec![
            post("dom_0_aaaa", IdSource::Synthesized, NOT_AVAILABLE, "a"),
            post("dom_1_aaaa", IdSource::Synthesized, NOT_AVAILABLE, "a"),
        ];
        assert_eq!(dedup_posts(posts).len(), 2);
    }
}
