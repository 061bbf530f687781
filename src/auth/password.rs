use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use tracing::error;
use validator::ValidationError;

use crate::error::ApiError;

/// Hash a plaintext password with argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal("password hashing failed".to_string())
        })
}

/// Check a plaintext password against a stored argon2 hash. An unparseable
/// hash counts as a mismatch rather than an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Stored password hash is unparseable: {}", e);
            false
        }
    }
}

/// Complexity rule applied on top of the 8-16 length bound: at least one
/// uppercase letter and one special character.
pub fn validate_password_complexity(password: &str) -> Result<(), ValidationError> {
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());
    if has_uppercase && has_special {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_complexity");
        err.message =
            Some("Password must contain at least one uppercase letter and one special character".into());
        Err(err)
    }
}
