//! Application configuration

use std::env;
use std::ops::RangeInclusive;

use subdash_billing::{
    DEFAULT_MONTHLY_UNIT_PRICE_CENTS, DEFAULT_PAGE_SIZE, DEFAULT_TRIAL_DAYS,
    DEFAULT_TRIAL_WINDOW_DAYS,
};

/// Accepted trial lengths, in days
const TRIAL_LENGTH_RANGE: RangeInclusive<i64> = 1..=365;
/// Accepted look-ahead for the upcoming trials list, in days
const TRIAL_WINDOW_RANGE: RangeInclusive<i64> = 0..=365;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub cors_allowed_origin: Option<String>,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Supabase
    pub supabase_jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_role_key: String,

    // Admin access; empty means any authenticated user
    pub admin_emails: Vec<String>,

    // Reporting
    pub monthly_unit_price_cents: i64,
    pub trial_length_days: i64,
    pub upcoming_trial_window_days: i64,
    pub users_page_size: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .ok()
                .filter(|origin| !origin.is_empty()),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),

            // Supabase
            supabase_jwt_secret: {
                let secret = env::var("SUPABASE_JWT_SECRET")
                    .map_err(|_| ConfigError::Missing("SUPABASE_JWT_SECRET"))?;
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "SUPABASE_JWT_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),

            admin_emails: env::var("ADMIN_EMAILS")
                .map(|list| parse_admin_emails(&list))
                .unwrap_or_default(),

            // Reporting
            monthly_unit_price_cents: parse_or(
                "MONTHLY_UNIT_PRICE_CENTS",
                DEFAULT_MONTHLY_UNIT_PRICE_CENTS,
            ),
            trial_length_days: parse_days(
                "TRIAL_LENGTH_DAYS",
                DEFAULT_TRIAL_DAYS,
                TRIAL_LENGTH_RANGE,
            )?,
            upcoming_trial_window_days: parse_days(
                "UPCOMING_TRIAL_WINDOW_DAYS",
                DEFAULT_TRIAL_WINDOW_DAYS,
                TRIAL_WINDOW_RANGE,
            )?,
            users_page_size: parse_or("USERS_PAGE_SIZE", DEFAULT_PAGE_SIZE).max(1),
        })
    }

    /// Whether `email` may use the dashboard
    pub fn is_admin_email(&self, email: Option<&str>) -> bool {
        if self.admin_emails.is_empty() {
            return true;
        }
        email.is_some_and(|email| {
            let email = email.trim().to_ascii_lowercase();
            self.admin_emails.iter().any(|admin| *admin == email)
        })
    }
}

/// Unset or unparsable values fall back to `default`
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`parse_or`], but a parsed value outside `range` is rejected
fn parse_days(
    key: &'static str,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    let days = parse_or(key, default);
    if !range.contains(&days) {
        return Err(ConfigError::OutOfRange {
            key,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(days)
}

fn parse_admin_emails(list: &str) -> Vec<String> {
    list.split(',')
        .map(|email| email.trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
    #[error("{key} must be between {min} and {max}")]
    OutOfRange {
        key: &'static str,
        min: i64,
        max: i64,
    },
}
