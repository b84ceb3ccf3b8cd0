//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Reminder scheduler configuration
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;
pub const LOOKAHEAD_WINDOW_MINS: i64 = 15;
pub const NOTIFY_LEAD_MINS: i64 = 10;
pub const SCHEDULER_JOIN_TIMEOUT_SECS: u64 = 5;

// Notification listing (read path)
pub const MEETING_RECENCY_MINS: i64 = 30;

// OTP configuration
pub const DEFAULT_OTP_TTL_SECS: i64 = 300;
pub const OTP_CODE_DIGITS: u32 = 6;
pub const DEFAULT_PURGE_CRON: &str = "0 0 * * * *"; // hourly, second-field cron

// Presentation
pub const DEFAULT_DISPLAY_TIMEZONE: &str = "UTC";
pub const LOCAL_TIME_FORMAT: &str = "%d %b %Y, %H:%M";
