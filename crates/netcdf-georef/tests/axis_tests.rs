//! Tests for axis classification and date encoding normalization.

use chrono::NaiveDate;
use georef_common::AxisDirection;
use netcdf_georef::{
    AxisAbbreviation, AxisRole, AxisRoleResolver, DateEncodingNormalizer, DecoderConfig, Dimension,
    PatternScope, Variable,
};
use test_utils::{fixtures, pack_date, pack_fields};

fn var(name: &str, attributes: &[(&str, &str)]) -> Variable {
    Variable::new(name, vec![Dimension::new(name, 2)]).with_attributes(attributes)
}

fn days_since_unix(year: i32, month: u32, day: u32) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    (NaiveDate::from_ymd_opt(year, month, day).unwrap() - epoch).num_days() as f64
}

// ============================================================================
// Axis classification tests
// ============================================================================

#[test]
fn test_synonyms_of_each_kind() {
    let cases = [
        (&fixtures::names::LONGITUDE[..], AxisAbbreviation::Longitude),
        (&fixtures::names::LATITUDE[..], AxisAbbreviation::Latitude),
        (&fixtures::names::HEIGHT[..], AxisAbbreviation::Height),
        (&fixtures::names::DEPTH[..], AxisAbbreviation::Depth),
        (&fixtures::names::TIME[..], AxisAbbreviation::Time),
    ];
    for (names, expected) in cases {
        for name in names {
            let by_name = var(name, &[]);
            assert_eq!(AxisRoleResolver::abbreviation(&by_name, true), Some(expected), "name {}", name);
            let upper = name.to_uppercase();
            let by_standard_name = var("v", &[("standard_name", upper.as_str())]);
            assert_eq!(
                AxisRoleResolver::abbreviation(&by_standard_name, true),
                Some(expected),
                "standard_name {}",
                upper
            );
        }
    }
}

#[test]
fn test_cf_fixtures() {
    let lon = var("a", fixtures::LONGITUDE);
    let lat = var("b", fixtures::LATITUDE);
    let time = var("c", fixtures::TIME);
    let pressure = var("d", fixtures::PRESSURE);
    let x = var("e", fixtures::PROJECTION_X);
    let y = var("f", fixtures::PROJECTION_Y);
    assert_eq!(AxisRoleResolver::abbreviation(&lon, true), Some(AxisAbbreviation::Longitude));
    assert_eq!(AxisRoleResolver::abbreviation(&lat, true), Some(AxisAbbreviation::Latitude));
    assert_eq!(AxisRoleResolver::abbreviation(&time, true), Some(AxisAbbreviation::Time));
    assert_eq!(AxisRoleResolver::role(&pressure, true), Some(AxisRole::Z));
    assert_eq!(AxisRoleResolver::abbreviation(&x, true), Some(AxisAbbreviation::Easting));
    assert_eq!(AxisRoleResolver::abbreviation(&y, true), Some(AxisAbbreviation::Northing));
}

#[test]
fn test_generic_names_yield_to_definitive_answers() {
    // Only the variable name speaks: generic answers are kept.
    assert_eq!(AxisRoleResolver::abbreviation(&var("x", &[("units", "m")]), true), Some(AxisAbbreviation::X));
    assert_eq!(AxisRoleResolver::abbreviation(&var("z", &[("units", "hPa")]), true), Some(AxisAbbreviation::Z));

    // A more authoritative attribute wins over the generic name.
    let y = var("y", &[("standard_name", "latitude")]);
    assert_eq!(AxisRoleResolver::abbreviation(&y, true), Some(AxisAbbreviation::Latitude));

    // A definitive unit answer wins over an earlier ambiguous one.
    let x = var("x", &[("units", "degrees_east")]);
    assert_eq!(AxisRoleResolver::abbreviation(&x, true), Some(AxisAbbreviation::Longitude));
    assert_eq!(AxisRoleResolver::abbreviation(&x, false), Some(AxisAbbreviation::X));
}

#[test]
fn test_unknown_variable_has_no_role() {
    let sst = var("sst", &[("units", "K"), ("long_name", "sea surface temperature")]);
    assert_eq!(AxisRoleResolver::abbreviation(&sst, true), None);
}

#[test]
fn test_abbreviation_directions() {
    assert_eq!(AxisAbbreviation::Depth.direction(), AxisDirection::Down);
    assert_eq!(AxisAbbreviation::Height.direction(), AxisDirection::Up);
    assert_eq!(AxisAbbreviation::Time.direction(), AxisDirection::Future);
    assert_eq!(AxisAbbreviation::Longitude.role(), AxisRole::X);
    assert_eq!(AxisAbbreviation::Northing.role(), AxisRole::Y);
}

// ============================================================================
// Date encoding tests
// ============================================================================

#[test]
fn test_packed_dates_without_time_axis() {
    let noon = NaiveDate::from_ymd_opt(2018, 10, 17).unwrap().and_hms_opt(12, 0, 0).unwrap();
    let mut date = Variable::new("date", vec![Dimension::new("obs", 2)])
        .with_attributes(fixtures::PACKED_TIME)
        .with_values(vec![20181017.0, pack_date(noon)]);
    let normalizer = DateEncodingNormalizer::new(&DecoderConfig::default());
    assert!(normalizer.normalize(&mut date, None));

    assert_eq!(date.units().as_deref(), Some("days since 1970-01-01 00:00:00"));
    let values = date.values().unwrap();
    assert_eq!(values[0], days_since_unix(2018, 10, 17));
    assert_eq!(values[1], days_since_unix(2018, 10, 17) + 0.5);
}

#[test]
fn test_packed_dates_in_local_time() {
    let config = DecoderConfig {
        timezone_offset_minutes: 120,
        ..Default::default()
    };
    let mut date = Variable::new("date", vec![Dimension::new("obs", 1)])
        .with_attribute("units", "day as %Y%m%d.%f")
        .with_values(vec![20181017.0]);
    assert!(DateEncodingNormalizer::new(&config).normalize(&mut date, None));
    let expected = days_since_unix(2018, 10, 17) - 2.0 / 24.0;
    assert!((date.values().unwrap()[0] - expected).abs() < 1e-9);
}

#[test]
fn test_climatological_dates_on_time_axis_only() {
    let normalizer = DateEncodingNormalizer::new(&DecoderConfig::default());
    let value = pack_fields(1990, &[(12, 2), (31, 2)]);

    let mut time = Variable::new("time", vec![Dimension::new("time", 1)])
        .with_attribute("units", "CCYYMMDD")
        .with_values(vec![value]);
    assert!(normalizer.normalize(&mut time, None));
    assert_eq!(time.values().unwrap(), &[days_since_unix(1990, 12, 31)]);
    assert_eq!(time.values().unwrap(), &[7669.0]);

    let mut other = Variable::new("valid", vec![Dimension::new("obs", 1)])
        .with_attribute("units", "CCYYMMDD")
        .with_values(vec![value]);
    assert!(!normalizer.normalize(&mut other, None));
    assert_eq!(other.values().unwrap(), &[value]);

    let config = DecoderConfig {
        climatological_scope: PatternScope::AnyVariable,
        ..Default::default()
    };
    assert!(DateEncodingNormalizer::new(&config).normalize(&mut other, None));
}

#[test]
fn test_climatological_hours_keep_their_unit() {
    let normalizer = DateEncodingNormalizer::new(&DecoderConfig::default());
    let mut time = Variable::new("time", vec![Dimension::new("time", 1)])
        .with_attribute("units", "CCYYMMDDHH")
        .with_values(vec![pack_fields(1970, &[(1, 2), (2, 2), (6, 2)])]);
    assert!(normalizer.normalize(&mut time, None));
    assert_eq!(time.units().as_deref(), Some("hours since 1970-01-01 00:00:00"));
    assert_eq!(time.values().unwrap(), &[30.0]);
}

#[test]
fn test_standard_units_are_untouched() {
    let normalizer = DateEncodingNormalizer::new(&DecoderConfig::default());
    let mut time = var("time", fixtures::TIME).with_values(vec![0.0, 1.0]);
    assert!(!normalizer.normalize(&mut time, None));
    assert_eq!(time.units().as_deref(), Some("days since 1970-01-01 00:00:00"));
}
