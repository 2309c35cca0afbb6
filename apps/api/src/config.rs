use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::db::retry::RetryPolicy;

/// Application configuration loaded from environment variables.
/// Built once in `main` and shared as `Arc<Config>`; never re-read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub anthropic_api_key: String,
    pub groq_api_key: String,
    pub llm_model: String,
    pub transcription_model: String,
    pub port: u16,
    pub rust_log: String,
    /// SQLite `busy_timeout`: how long a connection waits on a held lock before reporting busy.
    pub db_busy_timeout: Duration,
    pub db_max_attempts: u32,
    pub upload_retry_base: Duration,
    pub analyze_retry_base: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL", "sqlite://interview.db".to_string())?,
            upload_dir: PathBuf::from(optional_env("UPLOAD_DIR", "uploads".to_string())?),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            groq_api_key: require_env("GROQ_API_KEY")?,
            llm_model: optional_env("LLM_MODEL", "claude-sonnet-4-5".to_string())?,
            transcription_model: optional_env(
                "TRANSCRIPTION_MODEL",
                "whisper-large-v3".to_string(),
            )?,
            port: optional_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG", "info".to_string())?,
            db_busy_timeout: Duration::from_millis(optional_env("DB_BUSY_TIMEOUT_MS", 15_000)?),
            db_max_attempts: optional_env("DB_MAX_ATTEMPTS", 3)?,
            upload_retry_base: Duration::from_millis(optional_env("UPLOAD_RETRY_BASE_MS", 100)?),
            analyze_retry_base: Duration::from_millis(optional_env("ANALYZE_RETRY_BASE_MS", 200)?),
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
        })
    }

    pub fn upload_retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.db_max_attempts, self.upload_retry_base)
    }

    pub fn analyze_retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.db_max_attempts, self.analyze_retry_base)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
