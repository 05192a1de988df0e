/// One-time code generation and comparison.
use rand::Rng;

use super::token_digest::sha256_hex;

/// Codes are 6 decimal digits, the short-lived kind typed from an email.
pub const OTP_LENGTH: usize = 6;

/// Generate a 6-digit numeric code from the OS RNG.
pub fn generate_code() -> String {
    let n: u32 = rand::rngs::OsRng.gen_range(100_000..1_000_000);
    n.to_string()
}

/// Hash a raw code for storage.
pub fn hash_code(code: &str) -> String {
    sha256_hex(code)
}

/// Compare a submitted code against a stored digest without early exit.
/// Both sides are hashed first, so the comparison always runs over two
/// equal-length hex digests.
pub fn code_matches(submitted: &str, stored_hash: &str) -> bool {
    let submitted_hash = sha256_hex(submitted);

    let a = submitted_hash.as_bytes();
    let b = stored_hash.as_bytes();
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            // Never left-padded below the 6-digit floor
            assert!(code.parse::<u32>().unwrap() >= 100_000);
        }
    }

    #[test]
    fn test_code_matches_own_hash() {
        let code = generate_code();
        let hash = hash_code(&code);
        assert!(code_matches(&code, &hash));
    }

    #[test]
    fn test_wrong_code_does_not_match() {
        let hash = hash_code("123456");
        assert!(!code_matches("654321", &hash));
    }

    #[test]
    fn test_garbage_stored_digest_does_not_match() {
        assert!(!code_matches("123456", "deadbeef"));
    }
}
