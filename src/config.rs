//! Application configuration, read from the process environment (and `.env`
//! via dotenvy in the binary).

use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://storefront.db";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:8000";
const DEV_JWT_SECRET: &str = "storefront-dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be set when NOTIFIER=nats")]
    Missing(&'static str),
}

/// Which notification adapter the service wires in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotifierKind {
    Log,
    Nats { url: String, subject_prefix: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub notifier: NotifierKind,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub seed_catalog: bool,
    pub frontend_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
            notifier: NotifierKind::Log,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_hours: 24 * 7,
            seed_catalog: false,
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let notifier = match get("NOTIFIER").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("log") | Some("console") => NotifierKind::Log,
            Some("nats") => NotifierKind::Nats {
                url: get("NATS_URL").ok_or(ConfigError::Missing("NATS_URL"))?,
                subject_prefix: get("NATS_SUBJECT_PREFIX").unwrap_or_else(|| "storefront".to_string()),
            },
            Some(other) => {
                return Err(ConfigError::Invalid { name: "NOTIFIER", value: other.to_string() })
            }
        };

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set, using development secret");
                defaults.jwt_secret
            }
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), defaults.max_connections)?,
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|v| v.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
                .unwrap_or_default(),
            notifier,
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", get("JWT_TTL_HOURS"), defaults.jwt_ttl_hours)?,
            seed_catalog: parse_or("SEED_CATALOG", get("SEED_CATALOG"), defaults.seed_catalog)?,
            frontend_url: get("FRONTEND_URL").unwrap_or(defaults.frontend_url),
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
