/// Refresh token lifecycle.
///
/// A refresh token is an opaque 256-bit random value, hex-encoded to 64
/// characters, persisted verbatim as the row key. It is handed to the
/// client exactly once at issuance; afterwards it only ever comes back as
/// the same opaque string for refresh and logout lookups.
///
/// Tokens are consulted (never mutated) at refresh and marked revoked at
/// logout. There is no rotation and no sliding expiry: a token stays valid
/// for its full 60-day window until revoked. Rows are never deleted here;
/// expiry and revocation are checked lazily at use time.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Refresh token lifetime: 60 days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a fresh refresh token value from the OS entropy source.
///
/// Collision probability across 256 random bits is treated as negligible;
/// there is no uniqueness retry. A primary-key violation on insert would
/// surface from `save_refresh_token` as a database error.
pub fn generate_refresh_token() -> Result<String, AppError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::Internal(format!("refresh token generation failed: {}", e)))?;
    Ok(hex::encode(bytes))
}

/// Persist a refresh token for a user, expiring 60 days from now.
pub async fn save_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
) -> Result<(), AppError> {
    let now = Utc::now();
    let expires_at = now + Duration::days(REFRESH_TOKEN_TTL_DAYS);

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (token, user_id, expires_at, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Validate a refresh token and resolve its owning user.
///
/// Checks, in order: the value exists, it has not been revoked, it has not
/// expired. Each failure is a distinct `AuthError` for logging; all of them
/// render as the same generic 401. The row itself is left untouched, so
/// concurrent refreshes against the same valid token are each honored.
pub async fn validate_refresh_token(pool: &PgPool, token: &str) -> Result<Uuid, AppError> {
    let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>, Option<DateTime<Utc>>)>(
        r#"
        SELECT user_id, expires_at, revoked_at
        FROM refresh_tokens
        WHERE token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let (user_id, expires_at, revoked_at) = row.ok_or_else(|| {
        tracing::warn!("refresh token not found");
        AppError::Auth(AuthError::InvalidRefreshToken)
    })?;

    if revoked_at.is_some() {
        tracing::warn!(user_id = %user_id, "attempt to use revoked refresh token");
        return Err(AppError::Auth(AuthError::RevokedToken));
    }

    if Utc::now() >= expires_at {
        tracing::info!(user_id = %user_id, "refresh token expired");
        return Err(AppError::Auth(AuthError::ExpiredToken));
    }

    Ok(user_id)
}

/// Revoke a refresh token on behalf of its owner.
///
/// "Not found" and "already revoked" are treated as successful no-ops so
/// logout stays idempotent. A token owned by a different user than the
/// caller is never touched and fails with `NotAuthorized`.
pub async fn revoke_refresh_token(
    pool: &PgPool,
    token: &str,
    caller: Uuid,
) -> Result<(), AppError> {
    let row = sqlx::query_as::<_, (Uuid, Option<DateTime<Utc>>)>(
        r#"
        SELECT user_id, revoked_at
        FROM refresh_tokens
        WHERE token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let (owner, revoked_at) = match row {
        None => return Ok(()),
        Some(row) => row,
    };

    if owner != caller {
        tracing::warn!(
            caller = %caller,
            owner = %owner,
            "attempt to revoke another user's refresh token"
        );
        return Err(AppError::Auth(AuthError::NotAuthorized));
    }

    if revoked_at.is_some() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked_at = $1
        WHERE token = $2
        "#,
    )
    .bind(Utc::now())
    .bind(token)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %caller, "refresh token revoked");
    Ok(())
}
