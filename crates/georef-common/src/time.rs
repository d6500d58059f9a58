//! Time units of the form `"<unit> since <epoch>"`.

use crate::units::Unit;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A temporal unit together with its epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeUnits {
    pub unit: Unit,
    pub epoch: NaiveDateTime,
}

impl TimeUnits {
    pub fn new(unit: Unit, epoch: NaiveDateTime) -> Self {
        Self { unit, epoch }
    }

    /// Time units counted from 1970-01-01T00:00:00.
    pub fn since_unix_epoch(unit: Unit) -> Self {
        Self::new(unit, unix_epoch())
    }

    /// Parse CF time units such as `"days since 1970-01-01"` or
    /// `"hours since 2000-01-01T00:00:00Z"`.
    ///
    /// Returns `None` if the unit is not temporal or the epoch cannot be parsed.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (unit, epoch) = lower.split_once(" since ")?;
        let unit = Unit::parse(unit).filter(|u| u.is_temporal())?;
        let epoch = parse_epoch(epoch)?;
        Some(Self { unit, epoch })
    }

    /// Number of seconds in one unit.
    pub fn seconds_per_unit(&self) -> f64 {
        self.unit.seconds().unwrap_or(1.0)
    }

    /// Number of seconds from the Unix epoch to this epoch.
    pub fn epoch_seconds_from_unix(&self) -> f64 {
        let delta = self.epoch - unix_epoch();
        delta.num_milliseconds() as f64 / 1000.0
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} since {}",
            self.unit.plural_name(),
            self.epoch.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// 1970-01-01T00:00:00.
pub fn unix_epoch() -> NaiveDateTime {
    NaiveDateTime::default()
}

/// Parse the epoch part of CF time units.
///
/// Accepts dates with or without time, a `T` or space separator, optional
/// fractional seconds and a trailing `Z` or `UTC`.
pub fn parse_epoch(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let s = s
        .strip_suffix("utc")
        .or_else(|| s.strip_suffix('z'))
        .unwrap_or(s)
        .trim();
    let s = s.replacen('t', " ", 1);

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_days_since() {
        let units = TimeUnits::parse("days since 1970-01-01").unwrap();
        assert_eq!(units.unit, Unit::Day);
        assert_eq!(units.epoch, unix_epoch());
        assert_eq!(units.epoch_seconds_from_unix(), 0.0);
    }

    #[test]
    fn test_parse_iso_epoch() {
        let units = TimeUnits::parse("hours since 2000-01-01T12:00:00Z").unwrap();
        assert_eq!(units.unit, Unit::Hour);
        assert_eq!(units.epoch.format("%Y-%m-%d %H").to_string(), "2000-01-01 12");
    }

    #[test]
    fn test_parse_rejects_non_temporal() {
        assert!(TimeUnits::parse("metres since 1970-01-01").is_none());
        assert!(TimeUnits::parse("days").is_none());
        assert!(TimeUnits::parse("days since yesterday").is_none());
    }

    #[test]
    fn test_display_roundtrip() {
        let units = TimeUnits::parse("minutes since 1999-12-31 23:00").unwrap();
        assert_eq!(units.to_string(), "minutes since 1999-12-31 23:00:00");
        assert_eq!(TimeUnits::parse(&units.to_string()), Some(units));
    }
}
