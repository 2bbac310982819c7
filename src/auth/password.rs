use crate::error::AppError;
use bcrypt::{hash, verify};

const HASH_COST: u32 = 12;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, HASH_COST)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

/// Hashes on the blocking pool so bcrypt does not stall the worker's event loop.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Password hashing task failed: {}", e)))?
}

pub async fn verify_password_blocking(
    password: String,
    hashed_password: String,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hashed_password))
        .await
        .map_err(|e| {
            AppError::InternalServerError(format!("Password verification task failed: {}", e))
        })?
}
