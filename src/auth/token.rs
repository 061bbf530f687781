use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::ApiError;

/// Claims carried by an access token. The subject is the user id; role and
/// profile data are re-read from the database on every request so revoking
/// an account or changing a role takes effect immediately.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a token for the given user id, valid for `expiry_hours` from now.
pub fn mint_token(user_id: i32, secret: &str, expiry_hours: i64) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::hours(expiry_hours)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Token signing failed: {}", e);
        ApiError::Internal("token signing failed".to_string())
    })
}

/// Verify signature and expiry, returning the claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Token rejected: {}", e);
        ApiError::Unauthenticated("Invalid or expired token".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn mint_and_verify_round_trip() {
        let token = mint_token(42, SECRET, 24).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, 42);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint_token(42, SECRET, 24).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = mint_token(42, SECRET, 24).unwrap();
        let tampered = format!("{}x", token);
        assert!(verify_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Far enough in the past to clear the default validation leeway.
        let token = mint_token(42, SECRET, -2).unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }
}
