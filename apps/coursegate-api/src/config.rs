//! Application configuration loaded from environment variables.
//!
//! Loading is fail-fast: a missing required variable or an unparsable value
//! stops startup with a message naming the variable.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default SESSION_SECRET, accepted only in development.
pub const INSECURE_SESSION_SECRET: &str = "development-session-secret-change-in-production";

/// Application environment mode.
///
/// - `Development`: insecure defaults are allowed with a warning.
/// - `Production`: insecure defaults refuse startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    /// Parse an `APP_ENV` value. Unrecognized values mean `Development`.
    pub fn from_env_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }
}

impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Outbound email settings. Welcome emails are disabled when absent.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnvironment,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    /// HS256 secret shared with the auth layer that issues session tokens.
    pub session_secret: String,
    /// Admin API of the external auth provider.
    pub auth_api_url: String,
    pub auth_service_key: String,
    pub email: Option<EmailConfig>,
    pub login_url: String,
    pub external_call_timeout: Duration,
    pub login_sweep_timeout: Duration,
    pub reconciliation_page_cap: u32,
}

impl Config {
    /// Load configuration from the process environment (and `.env` when
    /// present).
    ///
    /// # Required Variables
    ///
    /// - `DATABASE_URL`
    /// - `AUTH_API_URL`, `AUTH_SERVICE_KEY`
    ///
    /// Everything else has a default; see [`Config::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        let app_env = AppEnvironment::from_env_str(&get("APP_ENV").unwrap_or_default());

        let port: u16 = get("PORT").unwrap_or_else(|| "8080".to_string()).parse()?;
        if port == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: "Port must be between 1 and 65535".to_string(),
            });
        }

        let email = match (get("EMAIL_API_URL"), get("EMAIL_API_KEY"), get("EMAIL_FROM")) {
            (Some(api_url), Some(api_key), Some(from)) => Some(EmailConfig {
                api_url,
                api_key,
                from,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue {
                    var: "EMAIL_API_URL".to_string(),
                    message: "EMAIL_API_URL, EMAIL_API_KEY and EMAIL_FROM must be set together"
                        .to_string(),
                })
            }
        };

        let config = Self {
            app_env,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout: Duration::from_secs(parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            cors_origins: get("CORS_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or_else(|| vec!["*".to_string()]),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?),
            max_body_bytes: parse_or(&get, "MAX_BODY_BYTES", 1024 * 1024)?,
            session_secret: get("SESSION_SECRET")
                .unwrap_or_else(|| INSECURE_SESSION_SECRET.to_string()),
            auth_api_url: required("AUTH_API_URL")?,
            auth_service_key: required("AUTH_SERVICE_KEY")?,
            email,
            login_url: get("LOGIN_URL").unwrap_or_else(|| "http://localhost:3000/login".to_string()),
            external_call_timeout: Duration::from_secs(parse_or(
                &get,
                "EXTERNAL_CALL_TIMEOUT_SECS",
                10,
            )?),
            login_sweep_timeout: Duration::from_secs(parse_or(&get, "LOGIN_SWEEP_TIMEOUT_SECS", 60)?),
            reconciliation_page_cap: parse_or(&get, "RECONCILIATION_PAGE_CAP", 10)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.reconciliation_page_cap == 0 {
            return Err(ConfigError::InvalidValue {
                var: "RECONCILIATION_PAGE_CAP".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.session_secret.len() < 32 && self.session_secret != INSECURE_SESSION_SECRET {
            return Err(ConfigError::InvalidValue {
                var: "SESSION_SECRET".to_string(),
                message: "must be at least 32 characters".to_string(),
            });
        }
        if self.app_env.is_production() && self.uses_insecure_session_secret() {
            return Err(ConfigError::InvalidValue {
                var: "SESSION_SECRET".to_string(),
                message: "the development default cannot be used in production".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn uses_insecure_session_secret(&self) -> bool {
        self.session_secret == INSECURE_SESSION_SECRET
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Lookup over a fixed map, for tests.
#[cfg(test)]
fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    use std::collections::HashMap;

    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}
