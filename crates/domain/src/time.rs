//! Presentation-layer time formatting
//!
//! Instants are stored as absolute UTC everywhere; localization happens here
//! and nowhere else. Message renderers call [`format_local`] at the display
//! boundary.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::constants::LOCAL_TIME_FORMAT;

/// Render a UTC instant in the given IANA timezone for display.
///
/// Unknown timezone names fall back to UTC rather than failing: a bad
/// display setting must never break reminder dispatch.
#[must_use]
pub fn format_local(instant: DateTime<Utc>, timezone: &str) -> String {
    let tz: Tz = timezone.parse().unwrap_or(Tz::UTC);
    instant.with_timezone(&tz).format(LOCAL_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format_local_converts_to_named_zone() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time");

        // IST is UTC+5:30, no DST
        let rendered = format_local(instant, "Asia/Kolkata");
        assert_eq!(rendered, "01 Jun 2025, 17:30");
    }

    #[test]
    fn test_format_local_utc_passthrough() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time");
        assert_eq!(format_local(instant, "UTC"), "01 Jun 2025, 12:00");
    }

    #[test]
    fn test_format_local_unknown_zone_falls_back_to_utc() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time");
        assert_eq!(format_local(instant, "Not/AZone"), "01 Jun 2025, 12:00");
    }
}
