use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub jwt_secret: String,
    pub feed_cache_ttl: Duration,
    pub groups_cache_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("YATUBE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("YATUBE_JWT_SECRET is unset or still a placeholder");
        }

        Ok(Self {
            host: var_or("YATUBE_HOST", "0.0.0.0"),
            port: parse_or("YATUBE_PORT", 8000)?,
            db_path: var_or("YATUBE_DB_PATH", "yatube.db").into(),
            media_dir: var_or("YATUBE_MEDIA_DIR", "./media").into(),
            jwt_secret,
            feed_cache_ttl: Duration::from_secs(parse_or("YATUBE_FEED_CACHE_SECS", 20)?),
            groups_cache_ttl: Duration::from_secs(parse_or("YATUBE_GROUPS_CACHE_SECS", 60)?),
            max_upload_bytes: parse_or("YATUBE_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {key} value {raw:?}")),
        Err(_) => Ok(default),
    }
}
