use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder secrets that MUST NOT be used to sign sessions.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "dev-secret-change-me", "secret"];

pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub secret_key: String,
    pub session_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Malformed values are errors,
    /// never silently replaced by defaults.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret_key = var("WARBLER_SECRET_KEY").unwrap_or_default();
        if secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            bail!("WARBLER_SECRET_KEY is unset or still a placeholder; set it in .env");
        }

        let db_path: PathBuf = var("WARBLER_DB_PATH")
            .unwrap_or_else(|| "warbler.db".into())
            .into();
        let host = var("WARBLER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("WARBLER_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("WARBLER_PORT must be a port number")?;
        let session_days: i64 = var("WARBLER_SESSION_DAYS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("WARBLER_SESSION_DAYS must be a whole number of days")?;
        if session_days <= 0 {
            bail!("WARBLER_SESSION_DAYS must be positive");
        }

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("WARBLER_HOST is not a valid address")?;

        Ok(Self {
            db_path,
            addr,
            secret_key,
            session_days,
        })
    }
}
