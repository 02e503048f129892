//! Password hashing and verification using Argon2.
//!
//! Uses the argon2id variant with default parameters. Hashes are stored in
//! PHC string format, salt included, in the credential metadata record.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{StoreError, StoreResult};

/// Hash a secret with a fresh random salt.
pub fn hash_secret(secret: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Internal(format!("hashing credential: {e}")))
}

/// Verify a secret against a stored PHC hash.
///
/// A mismatch is the unauthorized kind, distinct from the internal kind
/// raised when the stored hash itself is unusable.
pub fn verify_secret(secret: &str, hash: &str) -> StoreResult<()> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| StoreError::Internal(format!("stored credential hash is invalid: {e}")))?;
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .map_err(|_| StoreError::Unauthorized("credential mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_secret("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        verify_secret("correct horse battery staple", &hash).unwrap();

        let err = verify_secret("wrong", &hash).unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn same_secret_gets_distinct_salts() {
        let first = hash_secret("secret").unwrap();
        let second = hash_secret("secret").unwrap();
        assert_ne!(first, second);
        verify_secret("secret", &first).unwrap();
        verify_secret("secret", &second).unwrap();
    }

    #[test]
    fn garbage_hash_is_internal_not_unauthorized() {
        let err = verify_secret("secret", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, StoreError::Internal(_)));
    }
}
