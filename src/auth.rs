use sha2::{Digest, Sha256};

/// Hash a bearer token for lookup (SHA-256 hex).
/// Only hashes are stored in session_token.session_token_hash.
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}
