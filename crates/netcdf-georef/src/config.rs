//! Configuration for the decoder.

use crate::date_encoding::PatternScope;
use crate::linearizer::LinearizerKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Configuration for grid geometry and CRS inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Linearizers tried when fitting localization grids. Empty disables linearization.
    pub linearizers: BTreeSet<LinearizerKind>,

    /// Offset of the local time zone used by packed dates, in minutes east of UTC.
    pub timezone_offset_minutes: i32,

    /// Precision desired for localization grid inverse transforms, in grid cells.
    pub desired_precision: f64,

    /// Number of fitted grids kept strongly reachable by the global grid cache.
    pub global_cache_capacity: usize,

    /// Size in bytes of the buffer used when digesting coordinate values.
    pub digest_buffer_size: usize,

    /// Variables to which the packed `%Y%m%d` date pattern applies.
    pub packed_date_scope: PatternScope,

    /// Variables to which the climatological `CCYYMMDD…` pattern applies.
    pub climatological_scope: PatternScope,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            linearizers: BTreeSet::new(),
            timezone_offset_minutes: 0,
            desired_precision: projection::localization::DEFAULT_PRECISION,
            global_cache_capacity: 16,
            digest_buffer_size: 8192,
            packed_date_scope: PatternScope::AnyVariable,
            climatological_scope: PatternScope::TimeAxesOnly,
        }
    }
}

impl DecoderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GEOREF_LINEARIZERS") {
            config.linearizers = LinearizerKind::parse_list(&val);
        }

        if let Ok(val) = std::env::var("GEOREF_TIMEZONE_OFFSET_MINUTES") {
            if let Ok(offset) = val.trim().parse() {
                config.timezone_offset_minutes = offset;
            }
        }

        if let Ok(val) = std::env::var("GEOREF_GRID_PRECISION") {
            if let Ok(precision) = val.trim().parse() {
                config.desired_precision = precision;
            }
        }

        if let Ok(val) = std::env::var("GEOREF_GRID_CACHE_CAPACITY") {
            if let Ok(capacity) = val.trim().parse() {
                config.global_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("GEOREF_DIGEST_BUFFER_SIZE") {
            if let Ok(size) = val.trim().parse() {
                config.digest_buffer_size = size;
            }
        }

        if let Ok(val) = std::env::var("GEOREF_PACKED_DATE_SCOPE") {
            config.packed_date_scope = PatternScope::from_str(&val);
        }

        if let Ok(val) = std::env::var("GEOREF_CLIMATOLOGICAL_SCOPE") {
            config.climatological_scope = PatternScope::from_str(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.desired_precision > 0.0 && self.desired_precision.is_finite()) {
            return Err("desired_precision must be a positive number".to_string());
        }

        if self.global_cache_capacity == 0 {
            return Err("global_cache_capacity must be > 0".to_string());
        }

        if self.digest_buffer_size < 8 || self.digest_buffer_size % 8 != 0 {
            return Err("digest_buffer_size must be a positive multiple of 8".to_string());
        }

        if self.timezone_offset_minutes.abs() > 18 * 60 {
            return Err("timezone_offset_minutes must be within ±18 hours".to_string());
        }

        Ok(())
    }

    /// Enable the given linearizer.
    pub fn with_linearizer(mut self, kind: LinearizerKind) -> Self {
        self.linearizers.insert(kind);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.linearizers.is_empty());
        assert_eq!(config.desired_precision, 0.001);
        assert_eq!(config.packed_date_scope, PatternScope::AnyVariable);
        assert_eq!(config.climatological_scope, PatternScope::TimeAxesOnly);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = DecoderConfig {
            digest_buffer_size: 12,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DecoderConfig {
            global_cache_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DecoderConfig {
            desired_precision: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DecoderConfig {
            timezone_offset_minutes: 20 * 60,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_linearizer() {
        let config = DecoderConfig::default().with_linearizer(LinearizerKind::Universal);
        assert!(config.linearizers.contains(&LinearizerKind::Universal));
    }

    #[test]
    fn test_json_config() {
        let config = DecoderConfig::default().with_linearizer(LinearizerKind::Universal);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"linearizers\":[\"universal\"]"));
        let parsed: DecoderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
