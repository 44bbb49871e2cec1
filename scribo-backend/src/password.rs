//! Argon2id password hashing

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::LazyLock;

/// Hash of a random throwaway password, verified against when an email is unknown
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    let throwaway = SaltString::generate(&mut OsRng);
    hash_password(throwaway.as_str()).unwrap_or_default()
});

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Hash a password into a PHC string with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError(e.to_string()))
}

/// True if `password` matches the stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// A real Argon2id hash that no submitted password matches. Verifying against
/// it costs the same as verifying a stored hash.
pub fn dummy_password_hash() -> &'static str {
    DUMMY_HASH.as_str()
}
