//! Timestamp rendering and rendering options.
//!
//! Journal timestamps count microseconds from a fixed epoch that lies
//! 210,866,803,200 seconds before the Unix epoch. Expirations are plain Unix
//! seconds.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Seconds between the journal epoch and the Unix epoch.
pub const JOURNAL_EPOCH_OFFSET_SECS: i64 = 210_866_803_200;

const MICROS_PER_SEC: u64 = 1_000_000;
const DATE_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Time zone used when rendering timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneMode {
    /// Render in UTC with a `Z` suffix.
    #[default]
    Utc,
    /// Render in the local time zone without a suffix.
    Local,
}

/// How SOW expiration values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationFormat {
    /// The raw number of seconds.
    #[default]
    Numeric,
    /// An ISO-8601 timestamp.
    Iso,
}

/// Options threaded through every rendering call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Time zone for timestamps.
    pub zone: TimeZoneMode,
    /// Expiration rendering.
    pub expiration: ExpirationFormat,
}

impl RenderOptions {
    /// Creates options rendering UTC timestamps and numeric expirations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time zone.
    #[must_use]
    pub const fn zone(mut self, zone: TimeZoneMode) -> Self {
        self.zone = zone;
        self
    }

    /// Renders timestamps in local time when `value` is true.
    #[must_use]
    pub const fn local_time(mut self, value: bool) -> Self {
        self.zone = if value {
            TimeZoneMode::Local
        } else {
            TimeZoneMode::Utc
        };
        self
    }

    /// Sets the expiration format.
    #[must_use]
    pub const fn expiration(mut self, format: ExpirationFormat) -> Self {
        self.expiration = format;
        self
    }
}

/// Splits a journal timestamp into Unix seconds and microseconds.
#[must_use]
pub fn journal_time_to_unix(journal_time: u64) -> (i64, u32) {
    let secs = (journal_time / MICROS_PER_SEC) as i64 - JOURNAL_EPOCH_OFFSET_SECS;
    let micros = (journal_time % MICROS_PER_SEC) as u32;
    (secs, micros)
}

/// Converts Unix seconds and microseconds into a journal timestamp.
///
/// Returns `None` for instants before the journal epoch.
#[must_use]
pub fn unix_to_journal_time(secs: i64, micros: u32) -> Option<u64> {
    let shifted = u64::try_from(secs.checked_add(JOURNAL_EPOCH_OFFSET_SECS)?).ok()?;
    shifted
        .checked_mul(MICROS_PER_SEC)?
        .checked_add(u64::from(micros % 1_000_000))
}

/// Renders a journal timestamp as `YYYYMMDDTHHMMSS.ffffff`, with a `Z`
/// suffix in UTC mode. Zero renders as `unknown`.
#[must_use]
pub fn iso_timestamp(journal_time: u64, zone: TimeZoneMode) -> String {
    if journal_time == 0 {
        return "unknown".to_string();
    }
    let (secs, micros) = journal_time_to_unix(journal_time);
    format_unix(secs, micros, zone, true)
}

/// Renders a journal timestamp without the UTC `Z` suffix.
///
/// Kept for reports that predate the suffix.
#[must_use]
pub fn iso8601_timestamp(journal_time: u64, zone: TimeZoneMode) -> String {
    if journal_time == 0 {
        return "unknown".to_string();
    }
    let (secs, micros) = journal_time_to_unix(journal_time);
    format_unix(secs, micros, zone, false)
}

/// Renders an expiration (Unix seconds) as an ISO-8601 timestamp.
#[must_use]
pub fn expiration_timestamp(unix_secs: u64, zone: TimeZoneMode) -> String {
    if unix_secs == 0 {
        return "unknown".to_string();
    }
    match i64::try_from(unix_secs) {
        Ok(secs) => format_unix(secs, 0, zone, true),
        Err(_) => unix_secs.to_string(),
    }
}

fn format_unix(secs: i64, micros: u32, zone: TimeZoneMode, utc_suffix: bool) -> String {
    match zone {
        TimeZoneMode::Utc => match DateTime::<Utc>::from_timestamp(secs, 0) {
            Some(dt) => {
                let suffix = if utc_suffix { "Z" } else { "" };
                format!("{}.{micros:06}{suffix}", dt.format(DATE_FORMAT))
            }
            None => secs.to_string(),
        },
        TimeZoneMode::Local => match Local.timestamp_opt(secs, 0).earliest() {
            Some(dt) => format!("{}.{micros:06}", dt.format(DATE_FORMAT)),
            None => secs.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-02T03:04:05.123456Z
    const SAMPLE: u64 = (1_704_164_645 + 210_866_803_200) * 1_000_000 + 123_456;

    #[test]
    fn zero_is_unknown() {
        assert_eq!(iso_timestamp(0, TimeZoneMode::Utc), "unknown");
        assert_eq!(iso8601_timestamp(0, TimeZoneMode::Utc), "unknown");
        assert_eq!(expiration_timestamp(0, TimeZoneMode::Utc), "unknown");
    }

    #[test]
    fn utc_has_suffix() {
        assert_eq!(iso_timestamp(SAMPLE, TimeZoneMode::Utc), "20240102T030405.123456Z");
    }

    #[test]
    fn legacy_variant_drops_suffix() {
        assert_eq!(
            iso8601_timestamp(SAMPLE, TimeZoneMode::Utc),
            "20240102T030405.123456"
        );
    }

    #[test]
    fn local_has_no_suffix() {
        let rendered = iso_timestamp(SAMPLE, TimeZoneMode::Local);
        assert!(!rendered.ends_with('Z'));
        assert!(rendered.ends_with(".123456"));
    }

    #[test]
    fn expiration_uses_zero_micros() {
        assert_eq!(
            expiration_timestamp(1_704_164_645, TimeZoneMode::Utc),
            "20240102T030405.000000Z"
        );
    }

    #[test]
    fn unix_conversion_roundtrip() {
        assert_eq!(journal_time_to_unix(SAMPLE), (1_704_164_645, 123_456));
        assert_eq!(unix_to_journal_time(1_704_164_645, 123_456), Some(SAMPLE));
        assert_eq!(unix_to_journal_time(-JOURNAL_EPOCH_OFFSET_SECS - 1, 0), None);
    }

    #[test]
    fn options_builder() {
        let options = RenderOptions::new()
            .local_time(true)
            .expiration(ExpirationFormat::Iso);
        assert_eq!(options.zone, TimeZoneMode::Local);
        assert_eq!(options.expiration, ExpirationFormat::Iso);
        assert_eq!(RenderOptions::default().zone, TimeZoneMode::Utc);
    }
}
