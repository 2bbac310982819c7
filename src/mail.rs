//! Transactional email: verification and password-reset messages.
//!
//! Bodies are rendered from askama templates under `templates/`. `HttpMailer` posts
//! them to a Resend-style JSON API; `LogMailer` only logs them, for development
//! setups without a mail API key.

use askama::Template;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

use crate::auth::token::EMAIL_TOKEN_MINUTES;
use crate::config::MailConfig;
use crate::error::AppError;
use crate::models::User;

/// A rendered message ready to hand to a `Mailer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError>;
}

#[derive(Serialize)]
struct SendEmailPayload<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

/// Sends mail through an HTTP API authenticated with a bearer key.
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("todo-api/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        let payload = SendEmailPayload {
            from: &self.from,
            to: vec![email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::InternalServerError(format!(
                "Mail API returned HTTP {}: {}",
                status, body
            )));
        }

        log::info!("Sent \"{}\" to {}", email.subject, email.to);
        Ok(())
    }
}

/// Logs messages instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        log::info!(
            "Mail delivery disabled; would send \"{}\" to {}:\n{}",
            email.subject,
            email.to,
            email.html
        );
        Ok(())
    }
}

/// Picks `HttpMailer` when an API key is configured and `LogMailer` otherwise.
pub fn mailer_from_config(config: &MailConfig) -> Result<Box<dyn Mailer>, AppError> {
    match &config.api_key {
        Some(key) => Ok(Box::new(HttpMailer::new(
            config.api_url.clone(),
            key.clone(),
            config.from.clone(),
        )?)),
        None => {
            log::warn!("MAIL_API_KEY is not set; outgoing mail will only be logged");
            Ok(Box::new(LogMailer))
        }
    }
}

#[derive(Template)]
#[template(path = "verification_email.html")]
struct VerificationEmailTemplate<'a> {
    first_name: &'a str,
    username: &'a str,
    link: &'a str,
    expires_minutes: i64,
}

#[derive(Template)]
#[template(path = "reset_password_email.html")]
struct ResetPasswordEmailTemplate<'a> {
    first_name: &'a str,
    username: &'a str,
    link: &'a str,
    expires_minutes: i64,
}

/// HTML page shown after following a verification link.
#[derive(Template)]
#[template(path = "verification_result.html")]
pub struct VerificationResultPage {
    pub title: String,
    pub message: String,
    pub success: bool,
    pub login_url: String,
}

impl VerificationResultPage {
    pub fn success(frontend_url: &str) -> Self {
        Self {
            title: "Email verified".into(),
            message: "Your account is now active. You can sign in.".into(),
            success: true,
            login_url: format!("{}/login", frontend_url),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            title: "Verification failed".into(),
            message: message.into(),
            success: false,
            login_url: String::new(),
        }
    }
}

fn link_with_params(base: &str, params: &[(&str, &str)]) -> Result<String, AppError> {
    Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| AppError::InternalServerError(format!("Invalid link base {}: {}", base, e)))
}

/// `{public_url}/api/v1/auth/verify?email=..&v_token=..`
pub fn verification_link(public_url: &str, email: &str, token: &str) -> Result<String, AppError> {
    link_with_params(
        &format!("{}/api/v1/auth/verify", public_url),
        &[("email", email), ("v_token", token)],
    )
}

/// `{frontend_url}/reset-password?email=..&token=..`
pub fn reset_password_link(
    frontend_url: &str,
    email: &str,
    token: &str,
) -> Result<String, AppError> {
    link_with_params(
        &format!("{}/reset-password", frontend_url),
        &[("email", email), ("token", token)],
    )
}

pub fn verification_email(user: &User, link: &str) -> Result<OutgoingEmail, AppError> {
    let html = VerificationEmailTemplate {
        first_name: &user.first_name,
        username: &user.username,
        link,
        expires_minutes: EMAIL_TOKEN_MINUTES,
    }
    .render()?;
    Ok(OutgoingEmail {
        to: user.email.clone(),
        subject: "Verify your email address".into(),
        html,
    })
}

pub fn reset_password_email(user: &User, link: &str) -> Result<OutgoingEmail, AppError> {
    let html = ResetPasswordEmailTemplate {
        first_name: &user.first_name,
        username: &user.username,
        link,
        expires_minutes: EMAIL_TOKEN_MINUTES,
    }
    .render()?;
    Ok(OutgoingEmail {
        to: user.email.clone(),
        subject: "Reset your password".into(),
        html,
    })
}
