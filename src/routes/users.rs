use actix_web::{get, put, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::{
    auth::{policy::require_owner_or_admin, CurrentUser},
    error::AppError,
    models::{ProfileChanges, UserResponse},
    security::{alphabetic_name, CONTACT_NUMBER_REGEX, USERNAME_REGEX},
    state::AppState,
};

/// Optional profile fields for `PUT /user/user/{id}`. Absent fields stay unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserForm {
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: Option<String>,
    #[validate(length(max = 50), custom = "alphabetic_name")]
    pub first_name: Option<String>,
    #[validate(length(max = 50), custom = "alphabetic_name")]
    pub last_name: Option<String>,
    #[validate(regex(path = "CONTACT_NUMBER_REGEX", message = "Invalid contact number format"))]
    pub contact_number: Option<String>,
}

impl UpdateUserForm {
    fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            contact_number: self.contact_number,
        }
    }
}

/// Fetch a user profile
///
/// ## Responses:
/// - `200 OK`: the `UserResponse`.
/// - `403 Forbidden`: the caller is neither that user nor an admin.
/// - `404 Not Found`: no user has this id.
#[get("/user/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    caller: CurrentUser,
    user_id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = user_id.into_inner();
    require_owner_or_admin(&caller, user_id, "view this user")?;

    let user = state
        .users
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id: {} does not exist", user_id)))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Update a user profile
///
/// ## Responses:
/// - `200 OK`: the updated `UserResponse`.
/// - `400 Bad Request`: the new username belongs to another user.
/// - `403 Forbidden`: the caller is neither that user nor an admin.
/// - `404 Not Found`: no user has this id.
/// - `422 Unprocessable Entity`: a field failed validation.
#[put("/user/{id}")]
pub async fn update_user(
    state: web::Data<AppState>,
    caller: CurrentUser,
    user_id: web::Path<i32>,
    form: web::Form<UpdateUserForm>,
) -> Result<HttpResponse, AppError> {
    let user_id = user_id.into_inner();
    log::info!("User {} updating user {}", caller.id, user_id);
    require_owner_or_admin(&caller, user_id, "update this user")?;
    form.validate()?;

    let user = state
        .users
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id: {} does not exist", user_id)))?;

    let mut changes = form.into_inner().into_changes();
    if changes.username.as_deref() == Some(user.username.as_str()) {
        changes.username = None;
    }
    if let Some(username) = &changes.username {
        if let Some(other) = state.users.find_user_by_username(username).await? {
            if other.id != user.id {
                log::warn!("Username {} already taken by user {}", username, other.id);
                return Err(AppError::BadRequest("Username already exists".into()));
            }
        }
    }

    let updated = state.users.update_profile(user.id, changes).await?;
    log::info!("User {} updated", updated.id);
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}
