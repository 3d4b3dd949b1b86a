use crate::utils::text::normalize_whitespace;
use sha2::{Digest, Sha256};

/// Stable key for one logical buffered chat call.
///
/// Messages that differ only in case or whitespace share a key. Fields are
/// separated by a unit-separator byte so that adjacent values cannot bleed
/// into each other.
pub fn cache_fingerprint(
    requester_id: &str,
    activity_id: Option<&str>,
    message: &str,
    settings_digest: &str,
    use_retrieval: bool,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        requester_id,
        activity_id.unwrap_or(""),
        &normalize_whitespace(message),
        settings_digest,
        if use_retrieval { "rag" } else { "plain" },
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}
