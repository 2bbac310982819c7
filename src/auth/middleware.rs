use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::verify_access_token;
use crate::auth::SESSION_COOKIE;
use crate::error::AppError;
use crate::state::AppState;

/// Routes reachable without a session.
const PUBLIC_PATHS: &[&str] = &[
    "/api/v1/auth/create-user",
    "/api/v1/auth/verify",
    "/api/v1/auth/login",
    "/api/v1/auth/logout",
    "/api/v1/auth/forget-password",
    "/api/v1/auth/reset-password",
];

/// Validates the session token and stores its `Claims` in the request extensions.
///
/// The token is read from the `token` cookie, falling back to an
/// `Authorization: Bearer` header. Rejections are answered here with the JSON error
/// body so outer middleware (CORS, logging) still sees a response.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

fn is_public(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    PUBLIC_PATHS.contains(&path)
}

fn session_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let verified = match session_token(&req) {
            None => Err(AppError::Unauthorized("Token is missing".into())),
            Some(token) => match req.app_data::<web::Data<AppState>>() {
                Some(state) => verify_access_token(&token, &state.settings.secrets),
                None => Err(AppError::InternalServerError(
                    "Application state is not configured".into(),
                )),
            },
        };

        match verified {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(app_err) => {
                log::warn!("Rejected {} {}: {}", req.method(), req.path(), app_err);
                let response = req.error_response(app_err).map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
