//! Verification of session tokens issued by the identity provider.
//!
//! Tokens are HS256 JWTs over a shared secret; the subject claim carries
//! the provider's user id. The service never issues tokens itself.

use jwt_simple::prelude::*;

use crate::error::{AppError, Result};

pub fn session_key(secret: &str) -> HS256Key {
    HS256Key::from_bytes(secret.as_bytes())
}

/// Verify a session token and return the external user id from the
/// subject claim. Expiry and not-before are enforced by the library.
pub fn verify_session_token(key: &HS256Key, token: &str) -> Result<String> {
    let claims = key
        .verify_token::<NoCustomClaims>(token, None)
        .map_err(|_| AppError::unauthorized())?;

    claims
        .subject
        .filter(|s| !s.is_empty())
        .ok_or_else(AppError::unauthorized)
}

/// Issue a token for tests and local development.
pub fn issue_session_token(key: &HS256Key, external_user_id: &str) -> Result<String> {
    let claims = Claims::create(Duration::from_hours(1)).with_subject(external_user_id);
    key.authenticate(claims)
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}
