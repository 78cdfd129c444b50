use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Directory that holds the debug crops of one source image.
/// Layout: `<base>/<first_12_hex_chars>/`
pub fn artifact_dir(base: &Path, hash_hex: &str) -> PathBuf {
    base.join(&hash_hex[..hash_hex.len().min(12)])
}
