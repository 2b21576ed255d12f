use serde::Deserialize;

use crate::error::AppError;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Telegram Bot API token
    pub telegram_bot_token: String,

    /// SQLite connection string (default: `sqlite://herald.db`)
    pub database_url: String,

    /// Base URL of the CAS reputation service
    pub cas_api_url: String,

    /// Largest admin list that still gets notified; bigger groups fall back
    /// to explicit subscribers only (default: 10)
    pub max_admins: usize,

    /// Maximum number of SQLite connections in the pool (default: 5)
    pub db_max_connections: u32,

    /// Long-polling timeout for getUpdates, in seconds (default: 30)
    pub poll_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| {
                AppError::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://herald.db".to_string()),
            cas_api_url: std::env::var("CAS_API_URL")
                .unwrap_or_else(|_| "https://api.cas.chat".to_string()),
            max_admins: std::env::var("MAX_ADMINS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| AppError::Config("MAX_ADMINS must be a valid usize".to_string()))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("DB_MAX_CONNECTIONS must be a valid u32".to_string())
                })?,
            poll_timeout_secs: std::env::var("POLL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("POLL_TIMEOUT_SECS must be a valid u64".to_string())
                })?,
        })
    }
}
