/// Admin routes: the fileserver hit counter page and the dev-only reset.

use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::configuration::ApplicationSettings;
use crate::error::AppError;
use crate::middleware::HitCounter;

/// GET /api/admin/metrics
///
/// HTML page with the static fileserver hit count.
pub async fn admin_metrics(counter: web::Data<HitCounter>) -> HttpResponse {
    let body = format!(
        r#"<html>
<body>
    <h1>Welcome, Inkstream Admin</h1>
    <p>Server has been visited {} times!</p>
</body>
</html>"#,
        counter.load()
    );

    HttpResponse::Ok().content_type("text/html").body(body)
}

/// POST /api/admin/reset
///
/// Deletes all users (refresh tokens cascade) and zeroes the hit counter.
/// Only answers on the "dev" platform; 403 everywhere else.
pub async fn admin_reset(
    pool: web::Data<PgPool>,
    settings: web::Data<ApplicationSettings>,
    counter: web::Data<HitCounter>,
) -> Result<HttpResponse, AppError> {
    if settings.platform != "dev" {
        tracing::warn!("unauthorized attempt to access reset endpoint");
        return Ok(HttpResponse::Forbidden().finish());
    }

    sqlx::query("DELETE FROM users").execute(pool.get_ref()).await?;
    counter.reset();

    tracing::info!("database reset");
    Ok(HttpResponse::Ok().finish())
}
