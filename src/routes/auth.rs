/// Authentication routes: signup, signin, refresh, logout.
///
/// Signup and signin are the session issuer: they resolve or create the
/// identity, then mint an access token and a persisted refresh token as one
/// unit. A failure at any step aborts the whole issuance, so a client never
/// receives an access token without its stored refresh counterpart.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    generate_access_token, generate_refresh_token, hash_password, revoke_refresh_token,
    save_refresh_token, validate_refresh_token, verify_password, ACCESS_TOKEN_TTL_SECONDS,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::routes::users::{UserRecord, UserResponse};
use crate::validators::{is_valid_email, is_valid_name, is_valid_password, is_valid_username};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Mint the access/refresh pair for a user and persist the refresh token.
/// The refresh token plaintext is returned to the caller exactly once, here.
async fn issue_session(
    pool: &PgPool,
    jwt_config: &JwtSettings,
    user_id: Uuid,
) -> Result<TokenPair, AppError> {
    let access_token = generate_access_token(&user_id, jwt_config)?;
    let refresh_token = generate_refresh_token()?;
    save_refresh_token(pool, user_id, &refresh_token).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TOKEN_TTL_SECONDS,
    })
}

/// POST /api/auth/signup
///
/// Register a new user and issue a session.
///
/// # Errors
/// - 400: invalid email, username, name, or password
/// - 409: email or username already taken
/// - 500: hashing, signing, or persistence failure
pub async fn signup(
    form: web::Json<SignupRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let username = is_valid_username(&form.username)?;
    let name = is_valid_name(&form.name)?;
    is_valid_password(&form.password)?;

    let hashed_password = hash_password(&form.password)?;

    let now = Utc::now();
    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO users (id, email, username, name, hashed_password, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING id, email, username, name, bio, avatar_url, hashed_password,
                  created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&username)
    .bind(&name)
    .bind(&hashed_password)
    .bind(now)
    .fetch_one(pool.get_ref())
    .await?;

    let tokens = issue_session(pool.get_ref(), jwt_config.get_ref(), user.id).await?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok(HttpResponse::Created().json(SessionResponse {
        user: UserResponse::from(&user),
        tokens,
    }))
}

/// POST /api/auth/signin
///
/// Authenticate with email and password and issue a session.
///
/// Unknown email and wrong password both answer 401 with the same message,
/// so the response does not reveal which factor failed.
///
/// # Errors
/// - 400: empty email or password
/// - 401: invalid credentials
/// - 500: signing or persistence failure
pub async fn signin(
    form: web::Json<SigninRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    if form.email.trim().is_empty() {
        return Err(ValidationError::EmptyField("email").into());
    }
    if form.password.is_empty() {
        return Err(ValidationError::EmptyField("password").into());
    }

    let email = form.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, username, name, bio, avatar_url, hashed_password,
               created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        tracing::warn!("signin attempt for unknown email");
        AppError::Auth(AuthError::InvalidCredentials)
    })?;

    if !verify_password(&form.password, &user.hashed_password)? {
        tracing::warn!(user_id = %user.id, "signin attempt with wrong password");
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let tokens = issue_session(pool.get_ref(), jwt_config.get_ref(), user.id).await?;

    tracing::info!(user_id = %user.id, "user signed in");

    Ok(HttpResponse::Ok().json(SessionResponse {
        user: UserResponse::from(&user),
        tokens,
    }))
}

/// POST /api/auth/refresh
///
/// Exchange a valid refresh token for a new access token. The refresh token
/// itself is not rotated and its expiry does not slide; it stays usable
/// until revoked or expired.
///
/// # Errors
/// - 400: empty refresh token
/// - 401: unknown, revoked, or expired refresh token (indistinguishable)
/// - 500: signing or persistence failure
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    if form.refresh_token.is_empty() {
        return Err(ValidationError::EmptyField("refresh_token").into());
    }

    let user_id = validate_refresh_token(pool.get_ref(), &form.refresh_token).await?;
    let access_token = generate_access_token(&user_id, jwt_config.get_ref())?;

    tracing::info!(user_id = %user_id, "access token refreshed");

    Ok(HttpResponse::Ok().json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TOKEN_TTL_SECONDS,
    }))
}

/// POST /api/auth/logout
///
/// Revoke a refresh token. Requires a valid access token; the refresh token
/// must belong to the caller. Access tokens already issued from this
/// session stay valid until their own expiry.
///
/// # Errors
/// - 400: empty refresh token
/// - 401: missing or invalid access token (gate)
/// - 403: refresh token owned by another user
/// - 500: persistence failure
pub async fn logout(
    form: web::Json<LogoutRequest>,
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    if form.refresh_token.is_empty() {
        return Err(ValidationError::EmptyField("refresh_token").into());
    }

    revoke_refresh_token(pool.get_ref(), &form.refresh_token, user.0).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}
