//! Content-derived version hashes for manifests.

use sha2::{Digest, Sha256};

/// Compute the version hash for one snapshot of a manifest.
///
/// The manifest URL is part of the digest so identical text served for two
/// different manifests still yields distinct generations.
pub fn compute_manifest_hash(manifest_url: &str, manifest_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(manifest_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(manifest_text.as_bytes());
    hex::encode(hasher.finalize())
}
