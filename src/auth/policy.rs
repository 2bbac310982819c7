//! Owner-or-admin authorization.
//!
//! Every check is a pure predicate over the caller's identity and role and the
//! resource owner's id; the `require_*` helpers turn a failed check into a 403.

use crate::auth::extractors::CurrentUser;
use crate::error::AppError;
use crate::models::Role;

pub fn is_admin(role: Role) -> bool {
    role == Role::Admin
}

/// `true` when the caller owns the resource or holds the admin role.
pub fn owner_or_admin(caller: &CurrentUser, owner_id: i32) -> bool {
    caller.id == owner_id || is_admin(caller.role)
}

pub fn require_owner_or_admin(
    caller: &CurrentUser,
    owner_id: i32,
    action: &str,
) -> Result<(), AppError> {
    if owner_or_admin(caller, owner_id) {
        return Ok(());
    }
    log::warn!(
        "User {} denied: {} (resource owner {})",
        caller.id,
        action,
        owner_id
    );
    Err(AppError::Forbidden(format!(
        "You are not allowed to {}",
        action
    )))
}

pub fn require_admin(caller: &CurrentUser, action: &str) -> Result<(), AppError> {
    if is_admin(caller.role) {
        return Ok(());
    }
    log::warn!("User {} denied admin-only action: {}", caller.id, action);
    Err(AppError::Forbidden(format!(
        "Only admins are allowed to {}",
        action
    )))
}
