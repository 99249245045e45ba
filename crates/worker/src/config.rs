//! Worker configuration

use std::env;

use subdash_shared::{SubdashError, SubdashResult};

/// Shortly after midnight UTC, every day (sec min hour day month weekday)
pub const DEFAULT_SNAPSHOT_CRON: &str = "0 5 0 * * *";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub activity_snapshot_cron: String,
}

impl WorkerConfig {
    pub fn from_env() -> SubdashResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SubdashError::Validation("DATABASE_URL must be set".to_string()))?;

        Ok(Self {
            database_url,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            activity_snapshot_cron: env::var("ACTIVITY_SNAPSHOT_CRON")
                .ok()
                .filter(|cron| !cron.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_CRON.to_string()),
        })
    }
}
