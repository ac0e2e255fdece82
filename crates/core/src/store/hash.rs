//! Content fingerprinting for change detection.

use sha2::{Digest, Sha256};

/// Compute the fingerprint stored alongside a page's content.
///
/// Rows inserted before deep extraction are fingerprinted by URL; the
/// fingerprint is recomputed from the real text when content is attached.
pub fn content_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
