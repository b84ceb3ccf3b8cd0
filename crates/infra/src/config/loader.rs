//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `COHORT_DB_PATH`: Database file path
//! - `COHORT_DB_POOL_SIZE`: Connection pool size
//! - `COHORT_TICK_INTERVAL`: Dispatch tick interval in seconds
//! - `COHORT_LOOKAHEAD_MINUTES`: Materialization lookahead window in minutes
//! - `COHORT_NOTIFY_LEAD_MINUTES`: Reminder lead time in minutes
//! - `COHORT_SCHEDULER_ENABLED`: Whether the dispatch loop runs (true/false)
//! - `COHORT_RELAY_ENDPOINT`: Email relay URL
//! - `COHORT_RELAY_TOKEN`: Optional bearer token for the relay
//! - `COHORT_RELAY_TIMEOUT`: Relay request timeout in seconds
//! - `COHORT_OTP_TTL`: Login code lifetime in seconds (optional)
//! - `COHORT_OTP_PURGE_CRON`: Cron expression for the purge sweep (optional)
//! - `COHORT_DISPLAY_TIMEZONE`: IANA timezone for rendered times (optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./cohort.json` or `./cohort.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use cohort_domain::constants::{
    DEFAULT_DISPLAY_TIMEZONE, DEFAULT_OTP_TTL_SECS, DEFAULT_PURGE_CRON,
};
use cohort_domain::{
    CohortError, Config, DatabaseConfig, DisplayConfig, OtpConfig, RelayConfig, Result,
    SchedulerConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `CohortError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    // Try loading from environment first
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            // Fall back to file
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// All required environment variables must be present. Returns an error
/// if any are missing.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `CohortError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("COHORT_DB_PATH")?;
    let db_pool_size = env_var("COHORT_DB_POOL_SIZE").and_then(|s| {
        s.parse::<u32>().map_err(|e| CohortError::Config(format!("Invalid pool size: {}", e)))
    })?;

    let tick_interval = env_var("COHORT_TICK_INTERVAL").and_then(|s| {
        s.parse::<u64>().map_err(|e| CohortError::Config(format!("Invalid tick interval: {}", e)))
    })?;
    let lookahead_minutes = env_var("COHORT_LOOKAHEAD_MINUTES").and_then(|s| {
        s.parse::<i64>()
            .map_err(|e| CohortError::Config(format!("Invalid lookahead window: {}", e)))
    })?;
    let notify_lead_minutes = env_var("COHORT_NOTIFY_LEAD_MINUTES").and_then(|s| {
        s.parse::<i64>().map_err(|e| CohortError::Config(format!("Invalid notify lead: {}", e)))
    })?;
    let scheduler_enabled = env_bool("COHORT_SCHEDULER_ENABLED", true);

    let relay_endpoint = env_var("COHORT_RELAY_ENDPOINT")?;
    let relay_token = std::env::var("COHORT_RELAY_TOKEN").ok();
    let relay_timeout = env_var("COHORT_RELAY_TIMEOUT").and_then(|s| {
        s.parse::<u64>().map_err(|e| CohortError::Config(format!("Invalid relay timeout: {}", e)))
    })?;

    let otp_ttl = match std::env::var("COHORT_OTP_TTL").ok() {
        Some(s) => s
            .parse::<i64>()
            .map_err(|e| CohortError::Config(format!("Invalid OTP lifetime: {}", e)))?,
        None => DEFAULT_OTP_TTL_SECS,
    };
    let purge_cron = std::env::var("COHORT_OTP_PURGE_CRON")
        .unwrap_or_else(|_| DEFAULT_PURGE_CRON.to_string());
    let display_timezone = std::env::var("COHORT_DISPLAY_TIMEZONE")
        .unwrap_or_else(|_| DEFAULT_DISPLAY_TIMEZONE.to_string());

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        scheduler: SchedulerConfig {
            tick_interval_seconds: tick_interval,
            lookahead_minutes,
            notify_lead_minutes,
            enabled: scheduler_enabled,
        },
        relay: RelayConfig {
            endpoint: relay_endpoint,
            token: relay_token,
            timeout_seconds: relay_timeout,
        },
        otp: OtpConfig { ttl_seconds: otp_ttl, purge_cron },
        display: DisplayConfig { timezone: display_timezone },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `CohortError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CohortError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CohortError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CohortError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Arguments
/// * `contents` - File contents as string
/// * `path` - Path to the file (for format detection and error messages)
///
/// # Errors
/// Returns `CohortError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CohortError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CohortError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CohortError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`, `./cohort.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    // Try current working directory
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("cohort.json"),
            cwd.join("cohort.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("cohort.json"),
                exe_dir.join("cohort.toml"),
                exe_dir.join("../config.json"),
                exe_dir.join("../config.toml"),
                exe_dir.join("../../config.json"),
                exe_dir.join("../../config.toml"),
            ]);
        }
    }

    // Return first existing candidate
    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `CohortError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| CohortError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Arguments
/// * `key` - Environment variable name
/// * `default` - Default value if variable is not set
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
