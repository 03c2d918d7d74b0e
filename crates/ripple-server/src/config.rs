use std::path::PathBuf;

use anyhow::{Context, bail};
use ripple_api::Settings;

/// Secrets that ship in sample `.env` files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "hard to guess string",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub secret_key: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub confirm_ttl_secs: u64,
    pub auth_ttl_secs: u64,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let secret_key = var("RIPPLE_SECRET_KEY").unwrap_or_default();
        if secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            bail!("RIPPLE_SECRET_KEY is unset or still a placeholder");
        }

        let defaults = Settings::default();
        let settings = Settings {
            admin_email: var("RIPPLE_ADMIN_EMAIL").filter(|e| !e.is_empty()),
            posts_per_page: parse(&var, "RIPPLE_POSTS_PER_PAGE", defaults.posts_per_page)?,
            followers_per_page: parse(
                &var,
                "RIPPLE_FOLLOWERS_PER_PAGE",
                defaults.followers_per_page,
            )?,
            comments_per_page: parse(
                &var,
                "RIPPLE_COMMENTS_PER_PAGE",
                defaults.comments_per_page,
            )?,
            max_comment_len: defaults.max_comment_len,
        };

        Ok(Self {
            secret_key,
            db_path: PathBuf::from(var("RIPPLE_DB_PATH").unwrap_or_else(|| "ripple.db".into())),
            host: var("RIPPLE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&var, "RIPPLE_PORT", 3000)?,
            confirm_ttl_secs: parse(&var, "RIPPLE_CONFIRM_TTL_SECS", 3600)?,
            auth_ttl_secs: parse(&var, "RIPPLE_AUTH_TTL_SECS", 216_000)?,
            settings,
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
