/// Unified error handling for the service.
///
/// Errors are split into domain-specific types (validation, database,
/// authentication) that all fold into a single `AppError` used for control
/// flow. `AppError` implements actix-web's `ResponseError`, so handlers can
/// simply return `Result<HttpResponse, AppError>`.
///
/// Public responses never reveal which internal check failed: every
/// credential or token problem surfaces with the same generic message and a
/// 401, while the precise cause is written to the structured log together
/// with a generated error id.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for request input
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    ConnectionPool(String),
    Unexpected(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::ConnectionPool(msg) => {
                write!(f, "Database connection error: {}", msg)
            }
            DatabaseError::Unexpected(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Authentication and authorization errors.
///
/// The variants stay distinct for logging; most of them collapse to the same
/// public message so a client cannot tell which factor failed.
#[derive(Debug)]
pub enum AuthError {
    /// Unknown email or wrong password on sign-in.
    InvalidCredentials,
    /// Authorization header absent on a protected route.
    MissingToken,
    /// Authorization header present but not `Bearer <token>`.
    MalformedHeader,
    /// Access token rejected: bad signature, wrong algorithm or issuer,
    /// malformed structure, expired, or non-UUID subject.
    InvalidToken,
    /// Refresh token value not found in the store.
    InvalidRefreshToken,
    /// Refresh token has a revocation timestamp set.
    RevokedToken,
    /// Refresh token is past its expiry.
    ExpiredToken,
    /// Caller tried to act on a token owned by a different user.
    NotAuthorized,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid credentials"),
            AuthError::MissingToken => write!(f, "authorization header required"),
            AuthError::MalformedHeader => write!(f, "invalid authorization header format"),
            AuthError::InvalidToken => write!(f, "invalid access token"),
            AuthError::InvalidRefreshToken => write!(f, "unknown refresh token"),
            AuthError::RevokedToken => write!(f, "refresh token has been revoked"),
            AuthError::ExpiredToken => write!(f, "refresh token has expired"),
            AuthError::NotAuthorized => write!(f, "refresh token belongs to another user"),
        }
    }
}

impl StdError for AuthError {}

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Database(DatabaseError),
    Auth(AuthError),
    /// Crypto, RNG, or signing failure. Rare, fatal to the request only.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => {
                AppError::Database(DatabaseError::NotFound("record not found".to_string()))
            }
            // Postgres 23505: unique_violation
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::Database(DatabaseError::UniqueConstraintViolation(
                    db.message().to_string(),
                ))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            _ => AppError::Database(DatabaseError::Unexpected(err.to_string())),
        }
    }
}

/// JSON body returned for every error response
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Generated id for correlating the response with log entries
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    /// Public-facing (status, code, message). Never derived from `Display`,
    /// which carries internal detail.
    fn public_parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => (
                StatusCode::CONFLICT,
                "DUPLICATE_ENTRY",
                "A user with this email or username already exists".to_string(),
            ),
            AppError::Database(DatabaseError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
            ),
            AppError::Database(DatabaseError::ConnectionPool(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable".to_string(),
            ),
            AppError::Database(DatabaseError::Unexpected(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Internal server error".to_string(),
            ),
            AppError::Auth(AuthError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            AppError::Auth(AuthError::MissingToken) => (
                StatusCode::UNAUTHORIZED,
                "AUTHORIZATION_REQUIRED",
                "Authorization header required".to_string(),
            ),
            AppError::Auth(AuthError::MalformedHeader) => (
                StatusCode::UNAUTHORIZED,
                "MALFORMED_AUTHORIZATION",
                "Invalid authorization header format".to_string(),
            ),
            // Token failures are indistinguishable from the outside.
            AppError::Auth(
                AuthError::InvalidToken
                | AuthError::InvalidRefreshToken
                | AuthError::RevokedToken
                | AuthError::ExpiredToken,
            ) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid or expired token".to_string(),
            ),
            AppError::Auth(AuthError::NotAuthorized) => (
                StatusCode::FORBIDDEN,
                "NOT_AUTHORIZED",
                "Not authorized to perform this action".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "validation error");
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::warn!(error_id = error_id, error = %self, "duplicate entry attempt");
            }
            AppError::Database(e) => {
                tracing::error!(error_id = error_id, error = %e, "database error");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "authentication error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.public_parts().0
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, code, message) = self.public_parts();
        let body = ErrorResponse::new(error_id, message, code.to_string(), status.as_u16());
        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400() {
        let err = AppError::from(ValidationError::EmptyField("email"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn duplicate_entry_maps_to_409() {
        let err = AppError::Database(DatabaseError::UniqueConstraintViolation(
            "users_email_key".to_string(),
        ));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn token_failures_share_one_public_message() {
        let causes = [
            AuthError::InvalidToken,
            AuthError::InvalidRefreshToken,
            AuthError::RevokedToken,
            AuthError::ExpiredToken,
        ];
        let messages: Vec<_> = causes
            .into_iter()
            .map(|c| AppError::Auth(c).public_parts())
            .collect();

        for (status, code, message) in &messages {
            assert_eq!(*status, StatusCode::UNAUTHORIZED);
            assert_eq!(*code, "INVALID_TOKEN");
            assert_eq!(message, "Invalid or expired token");
        }
    }

    #[test]
    fn signin_failure_is_generic() {
        let (status, _, message) = AppError::Auth(AuthError::InvalidCredentials).public_parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Invalid email or password");
    }

    #[test]
    fn acting_on_foreign_token_maps_to_403() {
        let err = AppError::Auth(AuthError::NotAuthorized);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_detail_never_reaches_public_message() {
        let err = AppError::Internal("rng exhausted: /dev/urandom".to_string());
        let (_, _, message) = err.public_parts();
        assert_eq!(message, "Internal server error");
    }
}
