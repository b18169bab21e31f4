/// Authentication core.
///
/// Credential hashing, access token (JWT) issuance/validation, and
/// refresh token lifecycle: generation, persistence, validation, revocation.

mod claims;
mod jwt;
mod password;
mod refresh_token;

pub use claims::Claims;
pub use jwt::generate_access_token;
pub use jwt::validate_access_token;
pub use jwt::ACCESS_TOKEN_TTL_SECONDS;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::generate_refresh_token;
pub use refresh_token::revoke_refresh_token;
pub use refresh_token::save_refresh_token;
pub use refresh_token::validate_refresh_token;
pub use refresh_token::REFRESH_TOKEN_TTL_DAYS;
