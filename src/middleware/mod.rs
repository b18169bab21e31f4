/// Request middleware.
///
/// Authorization gates (required and optional), request logging, and the
/// static fileserver hit counter.

mod auth;
mod logging;
mod metrics;

pub use auth::AuthenticatedUser;
pub use auth::JwtMiddleware;
pub use auth::OptionalJwtMiddleware;
pub use logging::RequestLogger;
pub use metrics::HitCounter;
pub use metrics::MetricsMiddleware;
