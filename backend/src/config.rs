use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Largest facility the service will initialize
pub const MAX_TOTAL_SPACES: u32 = 1000;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// 0 keeps idle connections forever
    pub idle_timeout_secs: u64,
    /// 0 keeps connections forever
    pub max_lifetime_secs: u64,
}

/// Which parking tariff prices an exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffPolicy {
    /// Flat first hour, then a constant hourly rate
    Tiered,
    /// Constant hourly rate from the first minute
    Flat,
}

impl TariffPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TariffPolicy::Tiered => "tiered",
            TariffPolicy::Flat => "flat",
        }
    }
}

impl FromStr for TariffPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiered" => Ok(TariffPolicy::Tiered),
            "flat" => Ok(TariffPolicy::Flat),
            _ => Err(format!("Invalid PARKING_TARIFF: {}. Must be one of: tiered, flat", s)),
        }
    }
}

/// Fee configuration
#[derive(Debug, Clone)]
pub struct TariffConfig {
    pub policy: TariffPolicy,
    pub first_hour_fee: Decimal,
    pub hourly_rate: Decimal,
    pub flat_hourly_rate: Decimal,
    pub charging_rate_per_hour: Decimal,
}

/// Facility layout
#[derive(Debug, Clone)]
pub struct FacilityConfig {
    pub total_spaces: u32,
}

/// Plate assembly rules
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    pub min_length: usize,
    pub max_length: usize,
    /// When set, an assembled plate must contain it at least once
    pub separator: Option<char>,
}

/// Plate image cache
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub directory: PathBuf,
    pub grace_secs: u64,
    pub sweep_interval_secs: u64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub facility: FacilityConfig,
    pub tariff: TariffConfig,
    pub recognition: RecognitionConfig,
    pub images: ImageConfig,
    pub log_level: String,
    pub ws_port: u16,
    pub observer_queue_capacity: usize,
    pub environment: String,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_money(name: &str, default: i64) -> Result<Decimal, String> {
    let value = parse_var(name, Decimal::new(default, 0))?;
    if value < Decimal::ZERO {
        return Err(format!("{} must not be negative", name));
    }
    Ok(value)
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://parking.db".to_string());
        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 5u32)?;
        let acquire_timeout_secs = parse_var("DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64)?;
        let idle_timeout_secs = parse_var("DATABASE_IDLE_TIMEOUT_SECS", 600u64)?; // 10 minutes
        let max_lifetime_secs = parse_var("DATABASE_MAX_LIFETIME_SECS", 1800u64)?; // 30 minutes

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }

    /// In-memory database for tests. A single connection keeps the schema alive.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 0,
            max_lifetime_secs: 0,
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        (self.max_lifetime_secs > 0).then(|| Duration::from_secs(self.max_lifetime_secs))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://parking.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl TariffConfig {
    pub fn from_env() -> Result<Self, String> {
        let policy = env::var("PARKING_TARIFF")
            .map(|s| s.parse::<TariffPolicy>())
            .unwrap_or(Ok(TariffPolicy::Tiered))?;

        Ok(Self {
            policy,
            first_hour_fee: parse_money("PARKING_FIRST_HOUR_FEE", 60)?,
            hourly_rate: parse_money("PARKING_HOURLY_RATE", 20)?,
            flat_hourly_rate: parse_money("PARKING_FLAT_HOURLY_RATE", 50)?,
            charging_rate_per_hour: parse_money("CHARGING_RATE_PER_HOUR", 10)?,
        })
    }
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            policy: TariffPolicy::Tiered,
            first_hour_fee: Decimal::new(60, 0),
            hourly_rate: Decimal::new(20, 0),
            flat_hourly_rate: Decimal::new(50, 0),
            charging_rate_per_hour: Decimal::new(10, 0),
        }
    }
}

impl FacilityConfig {
    pub fn from_env() -> Result<Self, String> {
        let total_spaces = parse_var("PARKING_TOTAL_SPACES", 10u32)?;
        if total_spaces == 0 || total_spaces > MAX_TOTAL_SPACES {
            return Err(format!(
                "PARKING_TOTAL_SPACES must be between 1 and {}",
                MAX_TOTAL_SPACES
            ));
        }
        Ok(Self { total_spaces })
    }
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self { total_spaces: 10 }
    }
}

impl RecognitionConfig {
    pub fn from_env() -> Result<Self, String> {
        let min_length = parse_var("PLATE_MIN_LENGTH", 6usize)?;
        let max_length = parse_var("PLATE_MAX_LENGTH", 8usize)?;

        if min_length == 0 || min_length > max_length {
            return Err(format!(
                "Invalid plate length range: {}..={}",
                min_length, max_length
            ));
        }

        let separator = match env::var("PLATE_SEPARATOR") {
            Ok(raw) => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (None, _) => None,
                    // The separator ends up in image file names
                    (Some(c), None) if c.is_ascii_punctuation() && !matches!(c, '/' | '\\' | '.') => {
                        Some(c)
                    }
                    _ => {
                        return Err(format!(
                            "PLATE_SEPARATOR must be a single punctuation character other than '/', '\\' or '.': {}",
                            raw
                        ))
                    }
                }
            }
            Err(_) => Some('-'),
        };

        Ok(Self {
            min_length,
            max_length,
            separator,
        })
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 8,
            separator: Some('-'),
        }
    }
}

impl ImageConfig {
    pub fn from_env() -> Result<Self, String> {
        let directory = PathBuf::from(
            env::var("PLATE_IMAGE_DIR").unwrap_or_else(|_| "./uploads/plates".to_string()),
        );
        let grace_secs = parse_var("PLATE_IMAGE_GRACE_SECS", 60u64)?;
        let sweep_interval_secs = parse_var("IMAGE_SWEEP_INTERVAL_SECS", 600u64)?;

        if sweep_interval_secs == 0 {
            return Err("IMAGE_SWEEP_INTERVAL_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            directory,
            grace_secs,
            sweep_interval_secs,
        })
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./uploads/plates"),
            grace_secs: 60,
            sweep_interval_secs: 600,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let facility = FacilityConfig::from_env()?;
        let tariff = TariffConfig::from_env()?;
        let recognition = RecognitionConfig::from_env()?;
        let images = ImageConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ws_port = parse_var("WS_PORT", 5000u16)?;
        let observer_queue_capacity = parse_var("OBSERVER_QUEUE_CAPACITY", 32usize)?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        if observer_queue_capacity == 0 {
            return Err("OBSERVER_QUEUE_CAPACITY must be greater than 0".to_string());
        }

        Ok(Self {
            database,
            facility,
            tariff,
            recognition,
            images,
            log_level: log_level.to_lowercase(),
            ws_port,
            observer_queue_capacity,
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            facility: FacilityConfig::default(),
            tariff: TariffConfig::default(),
            recognition: RecognitionConfig::default(),
            images: ImageConfig::default(),
            log_level: "info".to_string(),
            ws_port: 5000,
            observer_queue_capacity: 32,
            environment: "development".to_string(),
        }
    }
}
