//!
//! # Application Errors
//!
//! This module defines `AppError`, the single error type returned by handlers, stores,
//! token helpers and the mailer. Every variant maps to one HTTP status so that handlers
//! can propagate failures with `?` and let Actix Web render them.
//!
//! `AppError` implements `actix_web::error::ResponseError`, producing a JSON body of the
//! form `{"error": "<message>"}`. `From` conversions exist for `sqlx::Error`,
//! `validator::ValidationErrors`, `jsonwebtoken::errors::Error`, `bcrypt::BcryptError`,
//! `askama::Error` and `reqwest::Error`.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed or expired credentials (HTTP 401).
    Unauthorized(String),
    /// The caller is authenticated but not allowed to perform the action (HTTP 403).
    /// Also used for rejected logins and inactive accounts.
    Forbidden(String),
    /// Malformed request or a duplicate value (HTTP 400).
    BadRequest(String),
    /// The requested resource does not exist (HTTP 404).
    NotFound(String),
    /// Unexpected server-side failure (HTTP 500).
    InternalServerError(String),
    /// Failure reported by the database driver (HTTP 500).
    DatabaseError(String),
    /// Input that deserialized fine but failed validation rules (HTTP 422).
    ValidationError(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg)
            | AppError::DatabaseError(msg)
            | AppError::ValidationError(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into JSON `HttpResponse` objects.
///
/// Server-side failures are logged here so handlers do not have to log before
/// propagating them.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        if self.status().is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(self.status()).json(json!({
            "error": self.message()
        }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes `NotFound` and unique-constraint violations become
/// `BadRequest`; everything else is a `DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                AppError::BadRequest("A record with this value already exists".into())
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Converts `jsonwebtoken::errors::Error` into `AppError::Unauthorized`.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<askama::Error> for AppError {
    fn from(error: askama::Error) -> AppError {
        AppError::InternalServerError(format!("Failed to render template: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> AppError {
        AppError::InternalServerError(format!("Failed to send email: {}", error))
    }
}
