/// Digests for opaque credentials. Refresh tokens and one-time codes are
/// stored as SHA-256 hex digests only; the raw value exists in memory and
/// on the wire, never in the database.
use rand::RngCore;
use sha2::{Digest, Sha256};

/// SHA-256 of a raw token or code, hex-encoded.
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate an opaque token: 32 bytes from the OS RNG, hex-encoded.
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
