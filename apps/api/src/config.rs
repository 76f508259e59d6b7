use anyhow::{Context, Result};

use crate::signup::cooldown::DEFAULT_RESEND_COOLDOWN_SECS;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the account backend (signup, resend, verify-email).
    pub accounts_api_url: String,
    /// Session store. Unset means the in-memory store.
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub session_ttl_secs: u64,
    pub resend_cooldown_secs: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            accounts_api_url: require_env("ACCOUNTS_API_URL")?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            session_ttl_secs: parse_env("SIGNUP_SESSION_TTL_SECS", 1800)?,
            resend_cooldown_secs: parse_env("RESEND_COOLDOWN_SECS", DEFAULT_RESEND_COOLDOWN_SECS)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
