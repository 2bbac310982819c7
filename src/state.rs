use std::sync::Arc;

use crate::config::{Config, TokenSecrets};
use crate::mail::Mailer;
use crate::store::{TaskStore, UserStore};

/// Settings handlers need at request time, split from `Config` so the server-only
/// parts (database URL, bind address, CORS) stay in `main`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub secrets: TokenSecrets,
    /// Base URL of this API, used in verification links.
    pub public_url: String,
    /// Base URL of the web client, used in password-reset links.
    pub frontend_url: String,
    pub cookie_secure: bool,
    pub allow_admin_signup: bool,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secrets: config.secrets.clone(),
            public_url: config.public_url.clone(),
            frontend_url: config.frontend_url.clone(),
            cookie_secure: config.cookie_secure,
            allow_admin_signup: config.allow_admin_signup,
        }
    }
}

/// Shared application state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub mailer: Arc<dyn Mailer>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        mailer: Arc<dyn Mailer>,
        settings: Settings,
    ) -> Self {
        Self {
            users,
            tasks,
            mailer,
            settings,
        }
    }
}
