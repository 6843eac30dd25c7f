use std::env;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub dispatch: DispatchConfig,
    pub security: SecurityConfig,
}

/// Database connection pool configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

/// Settings for message construction and delivery
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Calling code prepended to phones that lack it
    pub default_country_code: String,
    /// Fixed UTC offset (hours) of the recipients, used for date windows and formatting
    pub tz_offset_hours: i32,
    /// Pause between two sends of the same batch run
    pub inter_message_delay: Duration,
    /// Timeout applied to every gateway request
    pub http_timeout: Duration,
    /// Failed deliveries after which a target is no longer picked up by batch runs
    pub max_delivery_attempts: i64,
}

/// Security configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Shared secret the external scheduler presents as a Bearer token
    pub cron_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            database: DatabaseConfig::from_env()?,
            dispatch: DispatchConfig::from_env()?,
            security: SecurityConfig::from_env(),
        })
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        Ok(Self {
            url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            acquire_timeout: Duration::from_secs(
                env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            ),
            idle_timeout: Duration::from_secs(
                env::var("DATABASE_IDLE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
            ),
            max_lifetime: Duration::from_secs(
                env::var("DATABASE_MAX_LIFETIME_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .unwrap_or(1800),
            ),
        })
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_country_code: "55".to_string(),
            tz_offset_hours: -3,
            inter_message_delay: Duration::from_millis(500),
            http_timeout: Duration::from_secs(30),
            max_delivery_attempts: 3,
        }
    }
}

impl DispatchConfig {
    /// Load dispatch settings from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_country_code = env::var("DEFAULT_COUNTRY_CODE")
            .map(|v| v.trim().to_string())
            .unwrap_or(defaults.default_country_code);

        if default_country_code.is_empty()
            || !default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::InvalidCountryCode);
        }

        let tz_offset_hours: i32 = env::var("NOTIFY_TZ_OFFSET_HOURS")
            .unwrap_or_else(|_| defaults.tz_offset_hours.to_string())
            .parse()
            .unwrap_or(defaults.tz_offset_hours);

        if !(-12..=14).contains(&tz_offset_hours) {
            return Err(ConfigError::InvalidTimezoneOffset);
        }

        Ok(Self {
            default_country_code,
            tz_offset_hours,
            inter_message_delay: Duration::from_millis(
                env::var("INTER_MESSAGE_DELAY_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .unwrap_or(500),
            ),
            http_timeout: Duration::from_secs(
                env::var("WHATSAPP_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            ),
            max_delivery_attempts: env::var("MAX_DELIVERY_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(defaults.max_delivery_attempts),
        })
    }

    /// Recipients' fixed offset. Falls back to UTC if the stored hours are out of range.
    pub fn tz_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.tz_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

impl SecurityConfig {
    /// Load security configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    MissingDatabaseUrl,
    InvalidCountryCode,
    InvalidTimezoneOffset,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid number"),
            ConfigError::MissingDatabaseUrl => {
                write!(f, "DATABASE_URL environment variable is required")
            }
            ConfigError::InvalidCountryCode => {
                write!(f, "DEFAULT_COUNTRY_CODE must contain only digits")
            }
            ConfigError::InvalidTimezoneOffset => {
                write!(f, "NOTIFY_TZ_OFFSET_HOURS must be between -12 and 14")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
