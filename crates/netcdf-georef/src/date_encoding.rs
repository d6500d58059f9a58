//! Normalization of non-standard date encodings.
//!
//! Some files store dates as numbers whose decimal digits are calendar fields, for
//! example `20181017.5` with units `"day as %Y%m%d.%f"`, or climatological values with
//! units such as `"CCYYMMDD"`. The normalizer rewrites such variables in place to the
//! standard `"<unit> since <epoch>"` form.

use crate::axis_type::{AxisRole, AxisRoleResolver};
use crate::config::DecoderConfig;
use crate::variable::Variable;
use chrono::NaiveDate;
use georef_common::time::unix_epoch;
use georef_common::{TimeUnits, Unit};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Largest number of digits a field may have without overflowing a 32-bit integer.
const MAX_FIELD_DIGITS: usize = 9;

/// Variables to which a date pattern applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternScope {
    /// Any one-dimensional or text variable.
    AnyVariable,
    /// Only variables classified as time axes.
    TimeAxesOnly,
}

impl PatternScope {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "time" | "time_axes" | "time_axes_only" => Self::TimeAxesOnly,
            _ => Self::AnyVariable,
        }
    }
}

/// Known non-standard date encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePattern {
    /// `"day as %Y%m%d.%f"`: year, month and day digits with a fraction of day.
    PackedDigits,
    /// `"CCYYMMDDHHMMSS"` and its prefixes: concatenated calendar fields.
    Climatological,
}

/// A calendar field encoded in the low-order digits of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarField {
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl CalendarField {
    /// Fields in the order they appear after the year, with their unit letter.
    const ORDER: [(char, CalendarField); 5] = [
        ('M', CalendarField::Month),
        ('D', CalendarField::Day),
        ('H', CalendarField::Hour),
        ('M', CalendarField::Minute),
        ('S', CalendarField::Second),
    ];
}

/// Decomposition of encoded values into calendar fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBasis {
    /// Fields after the year, from most to least significant, with their digit count.
    pub fields: Vec<(CalendarField, u32)>,
    /// Unit of the fractional part of encoded values.
    pub raw_unit: Unit,
}

impl FieldBasis {
    /// Base of each field (10 to the power of its digit count).
    pub fn bases(&self) -> Vec<i64> {
        self.fields.iter().map(|(_, d)| 10_i64.pow(*d)).collect()
    }

    fn packed_digits() -> Self {
        Self {
            fields: vec![(CalendarField::Month, 2), (CalendarField::Day, 2)],
            raw_unit: Unit::Day,
        }
    }
}

fn packed_digits_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(r"(?i)^\s*(day|days|d)\s+as\s+%Y%m%d(\.%f)?\s*$").ok())
        .as_ref()
}

/// Whether the units describe the packed `%Y%m%d` encoding.
pub fn is_packed_digits(units: &str) -> bool {
    packed_digits_regex().is_some_and(|r| r.is_match(units))
}

/// Parse climatological units such as `"CCYYMMDD"` into a field basis.
///
/// Returns `None` if the fields are out of order, a field would have more than
/// 9 digits, or the units contain anything else.
pub fn parse_climatological(units: &str) -> Option<FieldBasis> {
    let units = units.trim().to_ascii_uppercase();
    let rest = units.strip_prefix("CCYY")?;
    let chars: Vec<char> = rest.chars().collect();
    let mut fields = Vec::new();
    let mut expected = CalendarField::ORDER.iter();
    let mut i = 0;
    while i < chars.len() {
        let letter = chars[i];
        let run = chars[i..].iter().take_while(|c| **c == letter).count();
        let (expected_letter, field) = expected.next()?;
        if letter != *expected_letter || run > MAX_FIELD_DIGITS {
            return None;
        }
        fields.push((*field, run as u32));
        i += run;
    }
    let raw_unit = match fields.last()?.0 {
        CalendarField::Second => Unit::Second,
        CalendarField::Minute => Unit::Minute,
        CalendarField::Hour => Unit::Hour,
        CalendarField::Month | CalendarField::Day => Unit::Day,
    };
    Some(FieldBasis { fields, raw_unit })
}

/// Rewrites variables using non-standard date encodings.
#[derive(Debug, Clone)]
pub struct DateEncodingNormalizer {
    packed_scope: PatternScope,
    climatological_scope: PatternScope,
    timezone_offset_minutes: i32,
}

impl DateEncodingNormalizer {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            packed_scope: config.packed_date_scope,
            climatological_scope: config.climatological_scope,
            timezone_offset_minutes: config.timezone_offset_minutes,
        }
    }

    /// Find the pattern matching the given units, in order of preference.
    pub fn detect(&self, units: &str) -> Option<(DatePattern, PatternScope, FieldBasis)> {
        if is_packed_digits(units) {
            return Some((
                DatePattern::PackedDigits,
                self.packed_scope,
                FieldBasis::packed_digits(),
            ));
        }
        parse_climatological(units)
            .map(|basis| (DatePattern::Climatological, self.climatological_scope, basis))
    }

    /// Rewrite the units and values of the variable if they use a known date encoding.
    ///
    /// `axis_units` are the time units of the axis associated to the variable's dimension,
    /// if any. Their epoch is borrowed for the target while the unit stays the one implied
    /// by the encoding. Returns `false` when the variable is left unchanged.
    pub fn normalize(&self, variable: &mut Variable, axis_units: Option<&TimeUnits>) -> bool {
        if variable.rank() > 1 && !variable.is_string() {
            return false;
        }
        let Some(units) = variable.units() else {
            return false;
        };
        let Some((pattern, scope, basis)) = self.detect(&units) else {
            return false;
        };
        if scope == PatternScope::TimeAxesOnly
            && AxisRoleResolver::role(variable, true) != Some(AxisRole::T)
        {
            return false;
        }

        let target = match axis_units {
            Some(axis) => TimeUnits::new(basis.raw_unit, axis.epoch),
            None => TimeUnits::since_unix_epoch(basis.raw_unit),
        };
        let raw_seconds = basis.raw_unit.seconds().unwrap_or(86_400.0);
        let offset = -target.epoch_seconds_from_unix() - self.timezone_offset_minutes as f64 * 60.0;
        let target_seconds = target.seconds_per_unit();

        let encoded: Vec<f64> = match (variable.values(), variable.text_values()) {
            (Some(values), _) => values.to_vec(),
            (None, Some(text)) => text
                .iter()
                .map(|s| s.trim().parse::<f64>().unwrap_or(f64::NAN))
                .collect(),
            (None, None) => return false,
        };
        let decoded = encoded
            .iter()
            .map(|v| {
                let raw = decode(*v, &basis, raw_seconds);
                (raw * raw_seconds + offset) / target_seconds
            })
            .collect();

        debug!(
            variable = variable.name(),
            pattern = ?pattern,
            units = %target,
            "Normalized date encoding"
        );
        variable.set_values(decoded);
        variable.set_units(target.to_string());
        true
    }
}

/// Decode one value into a count of raw units since the Unix epoch.
fn decode(value: f64, basis: &FieldBasis, raw_seconds: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        return f64::NAN;
    }
    let fraction = value.fract();
    let mut remaining = value.trunc() as i64;
    let mut month = 1;
    let mut day = 1;
    let mut seconds = 0.0;
    for ((field, _), base) in basis.fields.iter().zip(basis.bases()).rev() {
        let v = remaining % base;
        remaining /= base;
        match field {
            CalendarField::Month => month = v,
            CalendarField::Day => day = v,
            CalendarField::Hour => seconds += v as f64 * 3600.0,
            CalendarField::Minute => seconds += v as f64 * 60.0,
            CalendarField::Second => seconds += v as f64,
        }
    }
    let (Ok(year), Ok(month), Ok(day)) = (
        i32::try_from(remaining),
        u32::try_from(month),
        u32::try_from(day),
    ) else {
        return f64::NAN;
    };
    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
        return f64::NAN;
    };
    let days = (date - unix_epoch().date()).num_days() as f64;
    (days * 86_400.0 + seconds) / raw_seconds + fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_digits_regex() {
        assert!(is_packed_digits("day as %Y%m%d.%f"));
        assert!(is_packed_digits("Days as %Y%m%d"));
        assert!(is_packed_digits("d as %Y%m%d.%f"));
        assert!(!is_packed_digits("hours as %Y%m%d"));
        assert!(!is_packed_digits("days since 1970-01-01"));
    }

    #[test]
    fn test_climatological_basis() {
        let basis = parse_climatological("CCYYMMDD").unwrap();
        assert_eq!(basis.bases(), vec![100, 100]);
        assert_eq!(basis.raw_unit, Unit::Day);

        let basis = parse_climatological("CCYYMMDDHHMM").unwrap();
        assert_eq!(basis.fields.len(), 4);
        assert_eq!(basis.fields[3].0, CalendarField::Minute);
        assert_eq!(basis.raw_unit, Unit::Minute);
    }

    #[test]
    fn test_climatological_rejections() {
        assert_eq!(parse_climatological("CCYYDDMM"), None);
        assert_eq!(parse_climatological("CCYYDD"), None);
        assert_eq!(parse_climatological("CCYYMMMMMMMMMM"), None);
        assert_eq!(parse_climatological("CCYY"), None);
        assert_eq!(parse_climatological("CCYYMMDD UTC"), None);
        assert_eq!(parse_climatological("YYYYMMDD"), None);
    }

    #[test]
    fn test_decode_fields() {
        let basis = parse_climatological("CCYYMMDDHH").unwrap();
        // 1970-01-02 06h = 30 hours since the Unix epoch.
        assert_eq!(decode(1970010206.0, &basis, 3600.0), 30.0);
        assert!(decode(1970130206.0, &basis, 3600.0).is_nan());
        assert!(decode(f64::NAN, &basis, 3600.0).is_nan());
    }

    #[test]
    fn test_year_zero_is_proleptic() {
        let basis = parse_climatological("CCYYMMDD").unwrap();
        let days = decode(115.0, &basis, 86_400.0);
        let expected = (NaiveDate::from_ymd_opt(0, 1, 15).unwrap() - unix_epoch().date()).num_days();
        assert_eq!(days, expected as f64);
    }
}
