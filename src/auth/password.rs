/// Password hashing and verification with bcrypt.
///
/// Hashing salts per call, so equal inputs produce different digests.
/// Verification uses bcrypt's own constant-time comparison. The cost factor
/// is bcrypt's default and deliberately not configurable. Plaintext
/// passwords are never logged, stored, or echoed back; only internal
/// bcrypt failures (not input content) produce errors here.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

/// Hash a plaintext password.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored bcrypt digest.
///
/// Returns `Ok(false)` on mismatch; `Err` only on an internal bcrypt error
/// (e.g. a malformed digest).
pub fn verify_password(password: &str, digest: &str) -> Result<bool, AppError> {
    verify(password, digest)
        .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))
}
