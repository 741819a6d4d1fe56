//! Configuration management module.

use crate::pricing::PricingRules;
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub pricing: PricingRules,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which gateway takes the escrow charge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// Offline gateway that approves after a delay.
    #[default]
    Simulated,
    Http,
}

/// Payment gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub gateway: GatewayKind,
    /// Processing delay of the simulated gateway (default: 2000).
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
    /// Upper bound on a single charge in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_simulated_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

/// How AUTO picks a staff member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    #[default]
    Random,
    Ranked,
}

/// Booking flow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Slot labels offered on the Date & Time step.
    #[serde(default = "default_time_slots")]
    pub time_slots: Vec<String>,
    /// Let AUTO assign staff flagged unavailable. Set to `false` to pick
    /// only from available members.
    #[serde(default = "default_include_unavailable")]
    pub include_unavailable_staff: bool,
    #[serde(default)]
    pub selection: SelectionStrategy,
}

fn default_include_unavailable() -> bool {
    true
}

fn default_time_slots() -> Vec<String> {
    ["09:00 AM", "10:30 AM", "12:00 PM", "01:30 PM", "03:00 PM", "04:30 PM"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write daily rolling log files here in addition to stderr.
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Get config file path (platform config directory).
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("com", "The Guild", "guild-booking")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => ConfigLoadResult::Loaded(config),
                Err(e) => ConfigLoadResult::Invalid(e),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Parse and validate a config document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payment.timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "Payment timeout must be at least 1 second".to_string(),
            ));
        }
        if self.payment.gateway == GatewayKind::Http {
            if !self.payment.endpoint.starts_with("http") {
                return Err(ConfigError::Validation(
                    "Payment endpoint must start with http:// or https://".to_string(),
                ));
            }
            if self.payment.api_key.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Payment API key cannot be empty for the http gateway".to_string(),
                ));
            }
        }
        if self.pricing.director_multiplier < Decimal::ONE {
            return Err(ConfigError::Validation(
                "Director multiplier cannot be below 1".to_string(),
            ));
        }
        if self.pricing.escrow_fee_rate.is_sign_negative() || self.pricing.escrow_fee_rate >= Decimal::ONE {
            return Err(ConfigError::Validation(
                "Escrow fee rate must be between 0 and 1".to_string(),
            ));
        }
        if self.pricing.currency.len() != 3 || !self.pricing.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Validation(
                "Currency must be a three-letter ISO code".to_string(),
            ));
        }
        if self.booking.time_slots.is_empty() {
            return Err(ConfigError::Validation("At least one time slot is required".to_string()));
        }
        let mut seen = HashSet::new();
        for slot in &self.booking.time_slots {
            if slot.trim().is_empty() {
                return Err(ConfigError::Validation("Time slot labels cannot be empty".to_string()));
            }
            if !seen.insert(slot.as_str()) {
                return Err(ConfigError::Validation(format!("Duplicate time slot: {slot}")));
            }
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayKind::default(),
            simulated_delay_ms: default_simulated_delay_ms(),
            timeout_secs: default_timeout_secs(),
            endpoint: String::new(),
            api_key: String::new(),
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            time_slots: default_time_slots(),
            include_unavailable_staff: default_include_unavailable(),
            selection: SelectionStrategy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: None,
        }
    }
}
