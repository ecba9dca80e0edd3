//! Content fingerprint for dedup keying.
//!
//! Hashes `device + "\n" + content` when the sending device is known, the
//! content alone otherwise, so the same text forwarded from two devices
//! stays distinct while anonymous submissions still dedup on content.

use sha2::{Digest, Sha256};

/// Device label used when the sender did not identify itself.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// Compute the SHA-256 hex fingerprint of a (device, content) pair.
pub fn fingerprint(device: &str, content: &str) -> String {
    let digest = if device != UNKNOWN_DEVICE {
        Sha256::digest(format!("{device}\n{content}").as_bytes())
    } else {
        Sha256::digest(content.as_bytes())
    };
    hex::encode(digest)
}
