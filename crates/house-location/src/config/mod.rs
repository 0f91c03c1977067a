use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::listings::BestPricePolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Process-wide settings: HTTP binding, tracing, and listing business defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub listing: ListingConfig,
}

impl AppConfig {
    /// Reads `.env` (when present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        Ok(Self {
            environment,
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig::from_env(environment),
            listing: ListingConfig::from_env()?,
        })
    }
}

fn var_or(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// HTTP binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = var_or("APP_PORT", "3000")
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        Ok(Self {
            host: var_or("APP_HOST", "127.0.0.1"),
            port,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls. Colored output is only enabled for local development.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

impl TelemetryConfig {
    fn from_env(environment: AppEnvironment) -> Self {
        Self {
            log_level: var_or("APP_LOG_LEVEL", "info"),
            ansi: environment == AppEnvironment::Development,
        }
    }
}

/// Upper bound for `LISTING_AVAILABILITY_DAYS`, roughly a century.
pub const MAX_AVAILABILITY_LEAD_DAYS: i64 = 36_500;

/// Business defaults applied by the listing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingConfig {
    /// Days between creation and the default availability date.
    pub availability_lead_days: i64,
    pub best_price_policy: BestPricePolicy,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            availability_lead_days: 90,
            best_price_policy: BestPricePolicy::Retain,
        }
    }
}

impl ListingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let availability_lead_days = match env::var("LISTING_AVAILABILITY_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| (0..=MAX_AVAILABILITY_LEAD_DAYS).contains(days))
                .ok_or(ConfigError::InvalidAvailabilityDays { value: raw })?,
            Err(_) => defaults.availability_lead_days,
        };

        let best_price_policy = match env::var("LISTING_BEST_PRICE_POLICY") {
            Ok(raw) => raw
                .parse()
                .map_err(|value| ConfigError::InvalidBestPricePolicy { value })?,
            Err(_) => defaults.best_price_policy,
        };

        Ok(Self {
            availability_lead_days,
            best_price_policy,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidAvailabilityDays { value: String },
    InvalidBestPricePolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidAvailabilityDays { value } => write!(
                f,
                "LISTING_AVAILABILITY_DAYS must be a day count between 0 and {MAX_AVAILABILITY_LEAD_DAYS} (found '{value}')"
            ),
            ConfigError::InvalidBestPricePolicy { value } => write!(
                f,
                "LISTING_BEST_PRICE_POLICY must be 'retain' or 'reset' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidAvailabilityDays { .. }
            | ConfigError::InvalidBestPricePolicy { .. } => None,
        }
    }
}
