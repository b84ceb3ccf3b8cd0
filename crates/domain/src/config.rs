//! Application configuration structures

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DISPLAY_TIMEZONE, DEFAULT_OTP_TTL_SECS, DEFAULT_PURGE_CRON, DEFAULT_TICK_INTERVAL_SECS,
    LOOKAHEAD_WINDOW_MINS, NOTIFY_LEAD_MINS,
};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub relay: RelayConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Reminder scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub tick_interval_seconds: u64,
    pub lookahead_minutes: i64,
    pub notify_lead_minutes: i64,
    pub enabled: bool,
}

/// Email relay endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

/// OTP store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    pub ttl_seconds: i64,
    pub purge_cron: String,
}

/// Presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// IANA timezone name used when rendering instants for display.
    pub timezone: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig { path: "cohort.db".to_string(), pool_size: 4 },
            scheduler: SchedulerConfig::default(),
            relay: RelayConfig {
                endpoint: "http://localhost:8025/send".to_string(),
                token: None,
                timeout_seconds: 10,
            },
            otp: OtpConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: DEFAULT_TICK_INTERVAL_SECS,
            lookahead_minutes: LOOKAHEAD_WINDOW_MINS,
            notify_lead_minutes: NOTIFY_LEAD_MINS,
            enabled: true,
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { ttl_seconds: DEFAULT_OTP_TTL_SECS, purge_cron: DEFAULT_PURGE_CRON.to_string() }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { timezone: DEFAULT_DISPLAY_TIMEZONE.to_string() }
    }
}
