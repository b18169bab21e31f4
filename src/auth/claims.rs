/// Access token claims (RFC 7519 registered claims only).
///
/// The token is a pure identity assertion: issuer, subject (user UUID),
/// issued-at, and expiry. No profile data is embedded.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Issuer (service name)
    pub iss: String,
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, issuer: String, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            iss: issuer,
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_seconds,
        }
    }

    /// Extract the subject as a UUID. A non-UUID subject counts as an
    /// invalid token, same as any other verification failure.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| {
            tracing::warn!("access token subject is not a valid UUID");
            AppError::Auth(AuthError::InvalidToken)
        })
    }
}
