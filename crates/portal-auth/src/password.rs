//! Credential codec: one-way password digests and verification.
//!
//! Stored credentials are unsalted SHA-256 hex digests. That format is
//! kept as the default so existing accounts keep working; it is weak
//! against offline attacks. Argon2id is available as an opt-in scheme
//! and is recognised on verification regardless of the active scheme.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

/// Digest format used for new credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordScheme {
    /// Unsalted SHA-256, lowercase hex.
    #[default]
    Sha256Hex,
    /// Salted Argon2id, PHC string format.
    Argon2id,
}

/// Hash a password with the given scheme.
///
/// The pepper is only applied to Argon2id digests; SHA-256 digests
/// must stay byte-compatible with records written by earlier releases.
pub fn hash_password(
    password: &str,
    scheme: PasswordScheme,
    pepper: Option<&str>,
) -> Result<String, AuthError> {
    match scheme {
        PasswordScheme::Sha256Hex => Ok(sha256_hex(password)),
        PasswordScheme::Argon2id => {
            let input = peppered(password, pepper);
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(input.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))
        }
    }
}

/// Verify a plaintext password against a stored digest.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if a PHC-format digest is malformed or names
/// an algorithm other than Argon2.
pub fn verify_password(
    password: &str,
    digest: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    if !digest.starts_with('$') {
        let computed = sha256_hex(password);
        return Ok(computed.as_bytes().ct_eq(digest.as_bytes()).into());
    }

    let parsed_hash = argon2::PasswordHash::new(digest)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;
    if !matches!(
        parsed_hash.algorithm.as_str(),
        "argon2id" | "argon2i" | "argon2d"
    ) {
        return Err(AuthError::Crypto(format!(
            "unsupported hash algorithm: {}",
            parsed_hash.algorithm
        )));
    }

    let input = peppered(password, pepper);
    match Argon2::default().verify_password(input.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

fn sha256_hex(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn peppered(password: &str, pepper: Option<&str>) -> String {
    match pepper {
        Some(p) => format!("{p}{password}"),
        None => password.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_digest_matches_stored_format() {
        // Digest of "password" as stored by the deployed portal.
        assert_eq!(
            hash_password("password", PasswordScheme::Sha256Hex, None).unwrap(),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn sha256_is_deterministic_and_distinct() {
        let a = hash_password("hunter2", PasswordScheme::Sha256Hex, None).unwrap();
        let b = hash_password("hunter2", PasswordScheme::Sha256Hex, None).unwrap();
        let c = hash_password("hunter3", PasswordScheme::Sha256Hex, None).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn sha256_verification() {
        let digest = hash_password("hunter2", PasswordScheme::Sha256Hex, None).unwrap();
        assert!(verify_password("hunter2", &digest, None).unwrap());
        assert!(!verify_password("wrong", &digest, None).unwrap());
        assert!(!verify_password("hunter2", "", None).unwrap());
    }

    #[test]
    fn argon2_roundtrip_with_pepper() {
        let digest =
            hash_password("hunter2", PasswordScheme::Argon2id, Some("pepper!")).unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &digest, Some("pepper!")).unwrap());
        assert!(!verify_password("hunter2", &digest, None).unwrap());
        assert!(!verify_password("wrong", &digest, Some("pepper!")).unwrap());
    }

    #[test]
    fn argon2_digests_are_salted() {
        let a = hash_password("hunter2", PasswordScheme::Argon2id, None).unwrap();
        let b = hash_password("hunter2", PasswordScheme::Argon2id, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_phc_string_returns_error() {
        assert!(matches!(
            verify_password("pw", "$not-a-hash", None),
            Err(AuthError::Crypto(_))
        ));
        assert!(verify_password("pw", "$", None).is_err());
    }

    #[test]
    fn foreign_phc_algorithm_is_rejected() {
        let digest = "$pbkdf2-sha256$i=1000$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaA";
        assert!(matches!(
            verify_password("pw", digest, None),
            Err(AuthError::Crypto(_))
        ));
    }
}
