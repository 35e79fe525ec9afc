use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Number of random bytes in a credential secret (256 bits).
pub const CREDENTIAL_SECRET_BYTES: usize = 32;

/// Longest token accepted for verification. Anything longer is rejected
/// before hashing.
pub const MAX_PRESENTED_SECRET_LEN: usize = 512;

/// Generate a new credential secret.
///
/// Returns `(raw_secret, secret_hash)`. The raw secret is 64 lowercase hex
/// characters; the hash is the hex SHA-256 digest to store.
pub fn generate_credential_secret() -> (String, String) {
    let mut random_bytes = [0u8; CREDENTIAL_SECRET_BYTES];
    rand::thread_rng().fill(&mut random_bytes);

    let raw_secret = hex::encode(random_bytes);
    let secret_hash = hash_credential_secret(&raw_secret);

    (raw_secret, secret_hash)
}

/// Hash a credential secret using SHA-256, hex encoded.
pub fn hash_credential_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a raw secret against a stored hash in constant time.
pub fn verify_credential_secret(raw_secret: &str, stored_hash: &str) -> bool {
    hash_credential_secret(raw_secret)
        .as_bytes()
        .ct_eq(stored_hash.as_bytes())
        .into()
}

/// Cheap shape check on a presented token. Malformed tokens are treated as
/// "no identity" without touching storage.
pub fn is_plausible_secret(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_PRESENTED_SECRET_LEN
        && !token.chars().any(|c| c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secret_is_64_lowercase_hex() {
        let (raw, _) = generate_credential_secret();
        assert_eq!(raw.len(), 64);
        assert!(
            raw.chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_generated_secrets_are_unique() {
        let (a, hash_a) = generate_credential_secret();
        let (b, hash_b) = generate_credential_secret();
        assert_ne!(a, b);
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    fn test_hash_is_stable_and_not_the_secret() {
        let (raw, hash) = generate_credential_secret();
        assert_eq!(hash, hash_credential_secret(&raw));
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, raw);
    }

    #[test]
    fn test_known_sha256_vector() {
        assert_eq!(
            hash_credential_secret("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_credential_secret() {
        let (raw, hash) = generate_credential_secret();
        assert!(verify_credential_secret(&raw, &hash));

        let mut flipped = raw.clone();
        let last = flipped.pop().unwrap();
        flipped.push(if last == '0' { '1' } else { '0' });
        assert!(!verify_credential_secret(&flipped, &hash));
    }

    #[test]
    fn test_is_plausible_secret() {
        assert!(is_plausible_secret("abc123"));
        assert!(!is_plausible_secret(""));
        assert!(!is_plausible_secret("has space"));
        assert!(!is_plausible_secret("tab\there"));
        assert!(!is_plausible_secret(&"a".repeat(MAX_PRESENTED_SECRET_LEN + 1)));
        assert!(is_plausible_secret(&"a".repeat(MAX_PRESENTED_SECRET_LEN)));
    }
}
