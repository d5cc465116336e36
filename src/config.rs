use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::model::role::Role;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Pool
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Callers holding any of these roles only see their own attendance rows.
    pub self_scoped_roles: Vec<Role>,
    /// Reject `dateFrom > dateTo` instead of returning an empty page.
    pub validate_date_range: bool,
    /// Upper bound for `length` unless the client asks for all rows.
    pub max_page_length: u64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            db_max_connections: parsed("DB_MAX_CONNECTIONS", "10")?,
            db_acquire_timeout_secs: parsed("DB_ACQUIRE_TIMEOUT_SECS", "5")?,

            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            self_scoped_roles: parse_roles(
                &env::var("SELF_SCOPED_ROLES").unwrap_or_else(|_| "staff,admin".to_string()),
            ),
            validate_date_range: parsed("VALIDATE_DATE_RANGE", "true")?,
            max_page_length: parsed("MAX_PAGE_LENGTH", "1000")?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed("LOG_LEVEL", "debug")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: String::new(),
            server_addr: "127.0.0.1:8080".to_string(),
            db_max_connections: 10,
            db_acquire_timeout_secs: 5,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            self_scoped_roles: vec![Role::Staff, Role::Admin],
            validate_date_range: true,
            max_page_length: 1000,
            log_dir: "logs".to_string(),
            log_level: tracing::Level::DEBUG,
        }
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{key} has an invalid value {raw:?}: {e}"))
}

/// Comma separated role names, blanks dropped.
pub fn parse_roles(raw: &str) -> Vec<Role> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Role::parse)
        .collect()
}
