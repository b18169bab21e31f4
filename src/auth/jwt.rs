/// Access token issuance and validation.
///
/// Tokens are HS256 JWTs signed with the shared service secret. Validation
/// pins the algorithm (rejecting algorithm-substitution tokens) and the
/// issuer, and runs with zero expiry leeway so the 15-minute lifetime is
/// exact. Every rejection cause collapses to `AuthError::InvalidToken` at
/// the boundary; the cause is only distinguished in the log line.
///
/// There is no revocation for access tokens: one stays valid until its
/// expiry even if the session's refresh token is revoked in the meantime.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;

/// Issue a signed access token for a user.
pub fn generate_access_token(user_id: &Uuid, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new(*user_id, config.issuer.clone(), ACCESS_TOKEN_TTL_SECONDS);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("access token signing failed: {}", e)))
}

/// Validate an access token and resolve its subject.
///
/// Fails on: signature mismatch, non-HS256 algorithm, malformed structure,
/// expired `exp`, wrong issuer, or a subject that is not a UUID.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Uuid, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    // Default leeway is 60s; the expiry boundary must be exact.
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!(cause = %e, "access token rejected");
        AppError::Auth(AuthError::InvalidToken)
    })?;

    data.claims.user_id()
}
