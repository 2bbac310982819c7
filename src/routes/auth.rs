use actix_web::{get, http::StatusCode, post, web, HttpResponse, Responder};
use askama::Template;
use validator::Validate;

use crate::{
    auth::{
        generate_access_token,
        password::{hash_password_blocking, verify_password_blocking},
        removal_cookie, session_cookie,
        token::{generate_email_token, verify_email_token},
        ChangePasswordForm, CreateUserForm, CurrentUser, EmailTokenKind, ForgetPasswordForm,
        LoginForm, LoginResponse, MessageResponse, ResetPasswordForm, VerifyForm,
    },
    error::AppError,
    mail::{
        reset_password_email, reset_password_link, verification_email, verification_link,
        VerificationResultPage,
    },
    models::{NewUser, Role, UserResponse},
    state::AppState,
};

/// Register a new user
///
/// Creates an inactive account and mails a verification link to it.
///
/// ## Responses:
/// - `201 Created`: the new `UserResponse`.
/// - `400 Bad Request`: the username or email is already registered.
/// - `403 Forbidden`: `role=admin` while admin self-registration is disabled.
/// - `422 Unprocessable Entity`: a field failed validation.
#[post("/create-user")]
pub async fn create_user(
    state: web::Data<AppState>,
    form: web::Form<CreateUserForm>,
) -> Result<impl Responder, AppError> {
    form.validate()?;
    let form = form.into_inner();
    log::info!("Attempting to create user {} <{}>", form.username, form.email);

    let role = match form.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => raw.parse::<Role>().map_err(AppError::ValidationError)?,
        None => Role::User,
    };
    if role == Role::Admin && !state.settings.allow_admin_signup {
        log::warn!("Refused admin self-registration for {}", form.email);
        return Err(AppError::Forbidden(
            "Admin accounts cannot be self-registered".into(),
        ));
    }

    if state
        .users
        .find_user_by_username(&form.username)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("Username already exists".into()));
    }
    if state.users.find_user_by_email(&form.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = hash_password_blocking(form.password).await?;
    let user = state
        .users
        .create_user(NewUser {
            username: form.username,
            email: form.email,
            password_hash,
            role,
            first_name: form.first_name,
            last_name: form.last_name,
            contact_number: form.contact_number,
            gender: form.gender.filter(|g| !g.trim().is_empty()),
        })
        .await?;

    let token = generate_email_token(
        &user.email,
        EmailTokenKind::Verification,
        &state.settings.secrets,
    )?;
    let link = verification_link(&state.settings.public_url, &user.email, &token)?;
    state.mailer.send(verification_email(&user, &link)?).await?;

    log::info!("User {} created with id {}", user.username, user.id);
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

fn render_page(status: StatusCode, page: VerificationResultPage) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(page.render()?))
}

async fn verify(state: &AppState, form: VerifyForm) -> Result<HttpResponse, AppError> {
    log::info!("Attempting to verify email {}", form.email);

    let valid = verify_email_token(
        &form.email,
        &form.v_token,
        EmailTokenKind::Verification,
        &state.settings.secrets,
    );
    if !valid {
        log::warn!("Failed to verify email {}", form.email);
        return render_page(
            StatusCode::BAD_REQUEST,
            VerificationResultPage::failure("This verification link is invalid or has expired."),
        );
    }

    let Some(user) = state.users.find_user_by_email(&form.email).await? else {
        log::warn!("Verification for unknown email {}", form.email);
        return render_page(
            StatusCode::NOT_FOUND,
            VerificationResultPage::failure("No account is registered with this email."),
        );
    };

    if !user.is_active {
        state.users.activate(user.id).await?;
    }
    log::info!("Email {} verified", form.email);
    render_page(
        StatusCode::OK,
        VerificationResultPage::success(&state.settings.frontend_url),
    )
}

/// Verify an email address (form submission)
#[post("/verify")]
pub async fn verify_form(
    state: web::Data<AppState>,
    form: web::Form<VerifyForm>,
) -> Result<HttpResponse, AppError> {
    verify(&state, form.into_inner()).await
}

/// Verify an email address (link opened from the verification email)
#[get("/verify")]
pub async fn verify_link(
    state: web::Data<AppState>,
    query: web::Query<VerifyForm>,
) -> Result<HttpResponse, AppError> {
    verify(&state, query.into_inner()).await
}

/// Login user
///
/// Checks the credentials and sets the session cookie.
///
/// ## Responses:
/// - `200 OK`: `{"id": .., "is_admin": 0|1}` plus the `token` cookie.
/// - `403 Forbidden`: wrong password, or the account is not verified yet.
/// - `404 Not Found`: no account uses this email.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    form.validate()?;
    let LoginForm { email, password } = form.into_inner();
    log::info!("Attempting login for {}", email);

    let Some(user) = state.users.find_user_by_email(&email).await? else {
        log::warn!("Login for unknown email {}", email);
        return Err(AppError::NotFound("User not found".into()));
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        log::warn!("Invalid credentials for {}", email);
        return Err(AppError::Forbidden("Invalid Credentials".into()));
    }
    if !user.is_active {
        log::warn!("Inactive user {} attempted to log in", user.id);
        return Err(AppError::Forbidden("User is not active".into()));
    }

    let token = generate_access_token(user.id, user.role, &state.settings.secrets)?;
    log::info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, state.settings.cookie_secure))
        .json(LoginResponse {
            id: user.id,
            is_admin: u8::from(user.is_admin()),
        }))
}

/// Clears the session cookie. The token itself stays valid until it expires.
#[post("/logout")]
pub async fn logout() -> impl Responder {
    HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(MessageResponse::new("Logged out successfully"))
}

#[post("/forget-password")]
pub async fn forget_password(
    state: web::Data<AppState>,
    form: web::Form<ForgetPasswordForm>,
) -> Result<HttpResponse, AppError> {
    form.validate()?;
    log::info!("Password reset requested for {}", form.email);

    let Some(user) = state.users.find_user_by_email(&form.email).await? else {
        log::warn!("Password reset for unknown email {}", form.email);
        return Err(AppError::NotFound("User not found".into()));
    };

    let token = generate_email_token(
        &user.email,
        EmailTokenKind::PasswordReset,
        &state.settings.secrets,
    )?;
    let link = reset_password_link(&state.settings.frontend_url, &user.email, &token)?;
    state.mailer.send(reset_password_email(&user, &link)?).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Password reset email sent successfully",
    )))
}

/// Sets a new password from a mailed reset token. The token is checked before the
/// new password's strength.
#[post("/reset-password")]
pub async fn reset_password(
    state: web::Data<AppState>,
    form: web::Form<ResetPasswordForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    log::info!("Attempting password reset for {}", form.email);

    if !verify_email_token(
        &form.email,
        &form.token,
        EmailTokenKind::PasswordReset,
        &state.settings.secrets,
    ) {
        log::warn!("Invalid reset token for {}", form.email);
        return Err(AppError::BadRequest("Invalid reset token".into()));
    }
    form.validate()?;

    let Some(user) = state.users.find_user_by_email(&form.email).await? else {
        return Err(AppError::NotFound("User not found".into()));
    };

    let password_hash = hash_password_blocking(form.password).await?;
    state.users.set_password(user.id, &password_hash).await?;

    log::info!("Password reset for user {}", user.id);
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password reset successful")))
}

/// Change the caller's password
///
/// Requires the current password. On success the session cookie is cleared so the
/// client has to log in again.
#[post("/change-password")]
pub async fn change_password(
    state: web::Data<AppState>,
    caller: CurrentUser,
    form: web::Form<ChangePasswordForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    log::info!("Attempting to change password for user {}", caller.id);

    let user = state
        .users
        .find_user_by_id(caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !verify_password_blocking(form.old_password.clone(), user.password_hash.clone()).await? {
        log::warn!("Wrong current password for user {}", user.id);
        return Err(AppError::Forbidden("Invalid Password".into()));
    }
    if !user.is_active {
        log::warn!("Inactive user {} attempted a password change", user.id);
        return Err(AppError::Forbidden("User is not active".into()));
    }
    form.validate()?;

    let password_hash = hash_password_blocking(form.new_password).await?;
    state.users.set_password(user.id, &password_hash).await?;

    log::info!("Password changed for user {}", user.id);
    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(MessageResponse::new("Password changed successfully")))
}
