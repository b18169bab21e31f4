/// Authorization gate middleware.
///
/// `JwtMiddleware` protects routes: it reads the bearer access token from
/// the Authorization header, validates it, and injects the resolved
/// `AuthenticatedUser` into request extensions for handlers to extract via
/// `web::ReqData<AuthenticatedUser>`. Missing header, malformed scheme, and
/// failed validation each short-circuit with a 401.
///
/// `OptionalJwtMiddleware` runs the same parse and validation but swallows
/// any failure: the request is always forwarded, with or without an
/// identity attached. Handlers read `Option<web::ReqData<AuthenticatedUser>>`
/// and treat absence as the anonymous case.
///
/// Both gates only look at the Authorization header and never touch the
/// request body or any other request state.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::validate_access_token;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Request-scoped identity of the authenticated caller.
///
/// Set once by the gate, read by downstream handlers, dropped with the
/// request. Never shared across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

/// Pull the bearer token out of the Authorization header.
///
/// `Err(MissingToken)` when the header is absent, `Err(MalformedHeader)`
/// when it is not `Bearer <token>` (scheme matched case-insensitively).
fn extract_bearer_token(req: &ServiceRequest) -> Result<String, AuthError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let mut parts = header.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token.to_string())
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Required authorization gate.
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match extract_bearer_token(&req) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "request rejected at authorization gate");
                return Box::pin(async move { Err(AppError::Auth(e).into()) });
            }
        };

        match validate_access_token(&token, &self.jwt_config) {
            Ok(user_id) => {
                req.extensions_mut().insert(AuthenticatedUser(user_id));
                tracing::debug!(user_id = %user_id, "access token validated");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => Box::pin(async move { Err(e.into()) }),
        }
    }
}

/// Optional authorization gate.
pub struct OptionalJwtMiddleware {
    jwt_config: JwtSettings,
}

impl OptionalJwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for OptionalJwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = OptionalJwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(OptionalJwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct OptionalJwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for OptionalJwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Ok(token) = extract_bearer_token(&req) {
            if let Ok(user_id) = validate_access_token(&token, &self.jwt_config) {
                req.extensions_mut().insert(AuthenticatedUser(user_id));
            }
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
