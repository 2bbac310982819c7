pub mod extractors;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod token;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::security::{alphabetic_name, no_html, password_strength, CONTACT_NUMBER_REGEX, USERNAME_REGEX};

pub use extractors::CurrentUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{
    generate_access_token, verify_access_token, Claims, EmailTokenKind, ACCESS_TOKEN_MINUTES,
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Builds the httponly session cookie. `secure` cookies are also `SameSite=None` so the
/// separately hosted frontend can send them; otherwise `Lax` is used.
pub fn session_cookie(access_token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, access_token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Lax })
        .max_age(CookieDuration::minutes(ACCESS_TOKEN_MINUTES))
        .finish()
}

/// A cookie that instructs the browser to drop the session.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Registration form for `POST /auth/create-user`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserForm {
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "password_strength")]
    pub password: String,
    /// `admin` or `user`; defaults to `user`.
    pub role: Option<String>,
    #[validate(length(max = 50), custom = "alphabetic_name")]
    pub first_name: String,
    #[validate(length(max = 50), custom = "alphabetic_name")]
    pub last_name: String,
    #[validate(regex(path = "CONTACT_NUMBER_REGEX", message = "Invalid contact number format"))]
    pub contact_number: String,
    #[validate(length(max = 20), custom = "no_html")]
    pub gender: Option<String>,
}

/// Form for `/auth/verify`, accepted both as a POST body and as GET query parameters.
#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub email: String,
    pub v_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Body returned by a successful login; the token itself travels in the cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: i32,
    /// `1` for admins, `0` otherwise.
    pub is_admin: u8,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgetPasswordForm {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordForm {
    #[validate(email)]
    pub email: String,
    #[validate(custom = "password_strength")]
    pub password: String,
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordForm {
    pub old_password: String,
    #[validate(custom = "password_strength")]
    pub new_password: String,
}

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
