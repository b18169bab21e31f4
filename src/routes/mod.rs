mod admin;
mod auth;
mod health_check;
mod users;

pub use admin::admin_metrics;
pub use admin::admin_reset;
pub use auth::logout;
pub use auth::refresh;
pub use auth::signin;
pub use auth::signup;
pub use health_check::health_check;
pub use users::current_user;
pub use users::user_profile;
