use sha2::{Digest, Sha256};

use crate::models::ExtractionMethod;

/// Mints ids for records that carry no URN.
///
/// One minter lives for one extraction run. Ids combine the method, a
/// per-run counter and a content hash of (author, content, url): the counter
/// keeps them unique within the run, the hash gives a reader something stable
/// to compare across runs.
#[derive(Debug, Default)]
pub struct IdMinter {
    next: usize,
}

impl IdMinter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(
        &mut self,
        method: ExtractionMethod,
        author: &str,
        content: &str,
        url: &str,
    ) -> String {
        let n = self.next;
        self.next += 1;
        format!("{method}_{n}_{}", content_hash(author, content, url))
    }
}

/// Short hex digest of the identifying fields.
fn content_hash(author: &str, content: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [author, content, url] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
}
