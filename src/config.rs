use std::env;
use std::fmt;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost,http://localhost:3000,http://0.0.0.0,http://0.0.0.0:3000,http://0.0.0.0:8000";

/// Error raised when the environment does not describe a usable configuration.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Secrets for the three kinds of signed tokens the service issues.
#[derive(Clone)]
pub struct TokenSecrets {
    pub access: String,
    pub verification: String,
    pub reset_password: String,
}

impl fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("TokenSecrets(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    /// `None` means outgoing mail is only logged.
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    pub secrets: TokenSecrets,
    pub public_url: String,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
    pub allow_admin_signup: bool,
    pub mail: MailConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = parse_or("SERVER_PORT", get("SERVER_PORT"), 8080u16)?;
        let public_url = get("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => compose_database_url(&get)?,
        };

        Ok(Self {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 20)?,
            server_port,
            server_host,
            secrets: TokenSecrets {
                access: require("JWT_SECRET")?,
                verification: require("VERIFICATION_SECRET")?,
                reset_password: require("RESET_PASSWORD_SECRET")?,
            },
            public_url: public_url.trim_end_matches('/').to_string(),
            frontend_url: get("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            cors_origins: get("CORS_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            cookie_secure: parse_bool("COOKIE_SECURE", get("COOKIE_SECURE"), true)?,
            allow_admin_signup: parse_bool("ALLOW_ADMIN_SIGNUP", get("ALLOW_ADMIN_SIGNUP"), false)?,
            mail: MailConfig {
                api_url: get("MAIL_API_URL")
                    .unwrap_or_else(|| "https://api.resend.com/emails".to_string()),
                api_key: get("MAIL_API_KEY"),
                from: get("MAIL_FROM").unwrap_or_else(|| "noreply@example.com".to_string()),
            },
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn compose_database_url<G>(get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let host = get("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL"))?;
    let user = get("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let password = get("DB_PASSWORD").unwrap_or_default();
    let database = get("DB_DATABASE").ok_or(ConfigError::Missing("DB_DATABASE"))?;
    let port = get("DB_PORT").unwrap_or_else(|| "5432".to_string());
    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, database
    ))
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: value.unwrap_or_default(),
        }),
    }
}
