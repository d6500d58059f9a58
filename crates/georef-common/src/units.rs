//! Units of measurement found in netCDF `units` attributes.
//!
//! Only the units needed for axis classification and CRS construction are recognized.
//! Symbols follow the UDUNITS spelling used by CF files, so `"degrees_east"` parses as
//! [`Unit::Degree`] (the direction suffix is handled by [`crate::AxisDirection::from_units`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit of measurement recognized in coordinate variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Degree,
    Radian,
    Metre,
    Kilometre,
    Second,
    Minute,
    Hour,
    Day,
    Pascal,
    Hectopascal,
    /// Dimensionless values such as grid indices.
    Unity,
}

impl Unit {
    /// Parse a UDUNITS-like symbol.
    ///
    /// Accepts forms like:
    /// - "degrees_east", "degree_N", "degrees"
    /// - "days since 1970-01-01" (only the part before `since` is considered)
    /// - "hPa", "millibar", "Pa"
    pub fn parse(symbol: &str) -> Option<Self> {
        let lower = symbol.trim().to_ascii_lowercase();
        let head = match lower.find(" since ") {
            Some(i) => lower[..i].trim(),
            None => lower.as_str(),
        };
        if let Some(unit) = Self::from_symbol(head) {
            return Some(unit);
        }
        // "degrees_east" or "degrees north": try again without the direction suffix.
        let (base, _) = head.split_once(|c| c == '_' || c == ' ')?;
        Self::from_symbol(base)
    }

    fn from_symbol(s: &str) -> Option<Self> {
        let unit = match s {
            "degree" | "degrees" | "deg" | "°" | "arc_degree" | "angular_degree" => Unit::Degree,
            "rad" | "radian" | "radians" => Unit::Radian,
            "m" | "metre" | "meter" | "metres" | "meters" => Unit::Metre,
            "km" | "kilometre" | "kilometer" | "kilometres" | "kilometers" => Unit::Kilometre,
            "s" | "sec" | "secs" | "second" | "seconds" => Unit::Second,
            "min" | "mins" | "minute" | "minutes" => Unit::Minute,
            "h" | "hr" | "hrs" | "hour" | "hours" => Unit::Hour,
            "d" | "day" | "days" => Unit::Day,
            "pa" | "pascal" | "pascals" => Unit::Pascal,
            "hpa" | "hectopascal" | "hectopascals" | "mbar" | "millibar" | "millibars" => {
                Unit::Hectopascal
            }
            "1" | "count" => Unit::Unity,
            _ => return None,
        };
        Some(unit)
    }

    /// Whether this unit measures angles.
    pub fn is_angular(&self) -> bool {
        matches!(self, Unit::Degree | Unit::Radian)
    }

    /// Whether this unit measures lengths.
    pub fn is_linear(&self) -> bool {
        matches!(self, Unit::Metre | Unit::Kilometre)
    }

    /// Whether this unit measures durations.
    pub fn is_temporal(&self) -> bool {
        self.seconds().is_some()
    }

    /// Whether this unit measures pressures.
    pub fn is_pressure(&self) -> bool {
        matches!(self, Unit::Pascal | Unit::Hectopascal)
    }

    /// Number of seconds in one unit, or `None` if this is not a temporal unit.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Unit::Second => Some(1.0),
            Unit::Minute => Some(60.0),
            Unit::Hour => Some(3600.0),
            Unit::Day => Some(86400.0),
            _ => None,
        }
    }

    /// Short symbol of this unit.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Degree => "deg",
            Unit::Radian => "rad",
            Unit::Metre => "m",
            Unit::Kilometre => "km",
            Unit::Second => "s",
            Unit::Minute => "min",
            Unit::Hour => "h",
            Unit::Day => "d",
            Unit::Pascal => "Pa",
            Unit::Hectopascal => "hPa",
            Unit::Unity => "1",
        }
    }

    /// Plural name as written before `since` in CF time units.
    pub fn plural_name(&self) -> &'static str {
        match self {
            Unit::Degree => "degrees",
            Unit::Radian => "radians",
            Unit::Metre => "metres",
            Unit::Kilometre => "kilometres",
            Unit::Second => "seconds",
            Unit::Minute => "minutes",
            Unit::Hour => "hours",
            Unit::Day => "days",
            Unit::Pascal => "pascals",
            Unit::Hectopascal => "hectopascals",
            Unit::Unity => "1",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directional_degrees() {
        assert_eq!(Unit::parse("degrees_east"), Some(Unit::Degree));
        assert_eq!(Unit::parse("degree_N"), Some(Unit::Degree));
        assert_eq!(Unit::parse("degrees north"), Some(Unit::Degree));
        assert!(Unit::parse("degrees_east").unwrap().is_angular());
    }

    #[test]
    fn test_parse_time_units() {
        assert_eq!(Unit::parse("days since 1970-01-01"), Some(Unit::Day));
        assert_eq!(Unit::parse("Hours Since 2000-01-01 00:00"), Some(Unit::Hour));
        assert_eq!(Unit::parse("s").unwrap().seconds(), Some(1.0));
        assert!(Unit::Minute.is_temporal());
    }

    #[test]
    fn test_parse_pressure_and_unknown() {
        assert!(Unit::parse("hPa").unwrap().is_pressure());
        assert!(Unit::parse("millibar").unwrap().is_pressure());
        assert_eq!(Unit::parse("kelvin"), None);
        assert_eq!(Unit::parse(""), None);
    }
}
