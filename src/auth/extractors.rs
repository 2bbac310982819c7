use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;
use crate::models::Role;

/// The caller's identity, taken from the claims `AuthMiddleware` stored in the
/// request extensions.
///
/// Handlers on routes skipped by the middleware must not use this extractor; it
/// answers `401` whenever no claims are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Restricts a listing to the caller's own rows unless the caller is an admin.
    pub fn owner_scope(&self) -> Option<i32> {
        if self.is_admin() {
            None
        } else {
            Some(self.id)
        }
    }
}

impl From<&Claims> for CurrentUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.user_id,
            role: claims.role,
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) => ready(Ok(CurrentUser::from(claims))),
            None => {
                let err = AppError::Unauthorized("Token is missing".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
