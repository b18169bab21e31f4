use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::configuration::Settings;
use crate::middleware::{
    HitCounter, JwtMiddleware, MetricsMiddleware, OptionalJwtMiddleware, RequestLogger,
};
use crate::routes::{
    admin_metrics, admin_reset, current_user, health_check, logout, refresh, signin, signup,
    user_profile,
};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let jwt_config = settings.jwt.clone();
    let jwt_config_data = web::Data::new(settings.jwt);
    let app_settings = web::Data::new(settings.application);
    let hit_counter = Arc::new(HitCounter::new());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_config_data.clone())
            .app_data(app_settings.clone())
            .app_data(web::Data::from(hit_counter.clone()))
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/auth")
                            // Public: session issuance and refresh
                            .route("/signup", web::post().to(signup))
                            .route("/signin", web::post().to(signin))
                            .route("/refresh", web::post().to(refresh))
                            // Logout needs a valid access token
                            .service(
                                web::resource("/logout")
                                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                                    .route(web::post().to(logout)),
                            ),
                    )
                    .service(
                        web::resource("/users/me")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::get().to(current_user)),
                    )
                    .service(
                        web::resource("/users/{user_id}")
                            .wrap(OptionalJwtMiddleware::new(jwt_config.clone()))
                            .route(web::get().to(user_profile)),
                    )
                    .service(
                        web::scope("/admin")
                            .route("/metrics", web::get().to(admin_metrics))
                            .route("/reset", web::post().to(admin_reset)),
                    ),
            )
            // Static assets, counted by the hit counter
            .service(
                web::scope("/app")
                    .wrap(MetricsMiddleware::new(hit_counter.clone()))
                    .service(fs::Files::new("/", "./public").index_file("index.html")),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
