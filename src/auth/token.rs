use crate::config::TokenSecrets;
use crate::error::AppError;
use crate::models::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// Lifetime of a session token; matches the cookie max-age.
pub const ACCESS_TOKEN_MINUTES: i64 = 300;
/// Lifetime of verification and password-reset links.
pub const EMAIL_TOKEN_MINUTES: i64 = 30;

/// Represents the claims encoded within a session JWT.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Identifier of the authenticated user.
    pub user_id: i32,
    /// Role at the time the token was issued.
    pub role: Role,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Claims of the single-purpose tokens mailed to users.
#[derive(Debug, Serialize, Deserialize)]
struct EmailClaims {
    email: String,
    exp: usize,
}

/// Which secret signs an email token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTokenKind {
    Verification,
    PasswordReset,
}

impl EmailTokenKind {
    fn secret<'a>(&self, secrets: &'a TokenSecrets) -> &'a str {
        match self {
            EmailTokenKind::Verification => &secrets.verification,
            EmailTokenKind::PasswordReset => &secrets.reset_password,
        }
    }
}

fn expiry(minutes: i64) -> usize {
    (Utc::now() + Duration::minutes(minutes)).timestamp() as usize
}

/// Generates a session token carrying the user's id and role.
pub fn generate_access_token(
    user_id: i32,
    role: Role,
    secrets: &TokenSecrets,
) -> Result<String, AppError> {
    let claims = Claims {
        user_id,
        role,
        exp: expiry(ACCESS_TOKEN_MINUTES),
    };
    encode_claims(&claims, &secrets.access)
}

/// Verifies a session token and decodes its claims.
///
/// Expired tokens yield `Unauthorized("Token has expired")`; every other failure
/// (bad signature, wrong secret, malformed) yields
/// `Unauthorized("Could not validate credentials")`.
pub fn verify_access_token(token: &str, secrets: &TokenSecrets) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secrets.access.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::Unauthorized("Token has expired".into()),
        _ => AppError::Unauthorized("Could not validate credentials".into()),
    })
}

/// Generates a verification or password-reset token bound to `email`.
pub fn generate_email_token(
    email: &str,
    kind: EmailTokenKind,
    secrets: &TokenSecrets,
) -> Result<String, AppError> {
    let claims = EmailClaims {
        email: email.to_string(),
        exp: expiry(EMAIL_TOKEN_MINUTES),
    };
    encode_claims(&claims, kind.secret(secrets))
}

/// Returns `true` only when the token was signed with the secret for `kind`, has not
/// expired and was issued for `email`.
pub fn verify_email_token(
    email: &str,
    token: &str,
    kind: EmailTokenKind,
    secrets: &TokenSecrets,
) -> bool {
    match decode::<EmailClaims>(
        token,
        &DecodingKey::from_secret(kind.secret(secrets).as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data.claims.email == email,
        Err(e) => {
            log::debug!("Rejected {:?} token: {}", kind, e);
            false
        }
    }
}

fn encode_claims<T: Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}
