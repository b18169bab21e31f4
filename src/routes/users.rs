/// User profile routes.
///
/// `current_user` sits behind the required authorization gate;
/// `user_profile` behind the optional one, where a present viewer identity
/// only enriches the response and absence means an anonymous view.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;

/// Full identity row. The hashed password never leaves this type; API
/// responses are built through `UserResponse`.
#[derive(sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub name: String,
    pub bio: String,
    pub avatar_url: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub avatar_url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone().unwrap_or_default(),
            name: user.name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub is_me: bool,
}

pub(crate) async fn fetch_user(pool: &PgPool, user_id: Uuid) -> Result<UserRecord, AppError> {
    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, username, name, bio, avatar_url, hashed_password,
               created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// GET /api/users/me
///
/// Returns the authenticated caller's own profile. The identity is the one
/// the authorization gate resolved from the access token.
pub async fn current_user(
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let record = fetch_user(pool.get_ref(), user.0).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&record)))
}

/// GET /api/users/{user_id}
///
/// Public profile. Anonymous callers get the same data; a valid access
/// token only marks whether the profile belongs to the viewer.
pub async fn user_profile(
    path: web::Path<Uuid>,
    viewer: Option<web::ReqData<AuthenticatedUser>>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let record = fetch_user(pool.get_ref(), user_id).await?;

    let is_me = viewer.map(|v| v.0 == user_id).unwrap_or(false);

    Ok(HttpResponse::Ok().json(ProfileResponse {
        user: UserResponse::from(&record),
        is_me,
    }))
}
