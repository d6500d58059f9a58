//! Tests for the CRS model, time units and bounding boxes.

use georef_common::crs::{EPSG_UPS_NORTH, EPSG_UPS_SOUTH};
use georef_common::{
    AxesConvention, AxisDirection, BoundingBox, CoordinateAxis, Crs, CrsKind, GeodeticDatum,
    Projection, SingleCrs, TimeUnits, Unit,
};

fn temporal(unit: Unit) -> SingleCrs {
    SingleCrs {
        name: "time".to_string(),
        identifier: None,
        kind: CrsKind::Temporal { epoch: None },
        axes: vec![CoordinateAxis::new("time", "t", AxisDirection::Future, unit)],
    }
}

// ============================================================================
// EPSG lookup tests
// ============================================================================

#[test]
fn test_utm_zone_codes() {
    for zone in [1u32, 31, 60] {
        let north = SingleCrs::from_epsg(32600 + zone).unwrap();
        let south = SingleCrs::from_epsg(32700 + zone).unwrap();
        assert_eq!(north.identifier, Some(32600 + zone));
        assert_eq!(south.identifier, Some(32700 + zone));
        assert!(north.name.ends_with('N'));
        assert!(south.name.ends_with('S'));
    }
    assert!(SingleCrs::from_epsg(32600).is_err());
    assert!(SingleCrs::from_epsg(32700).is_err());
}

#[test]
fn test_ups_axes_follow_meridians() {
    let north = SingleCrs::from_epsg(EPSG_UPS_NORTH).unwrap();
    assert_eq!(north.axes[0].direction, AxisDirection::SouthAlong(90));
    assert_eq!(north.axes[1].direction, AxisDirection::SouthAlong(180));
    assert_eq!(north.axes[0].abbreviation, "E");

    let south = SingleCrs::from_epsg(EPSG_UPS_SOUTH).unwrap();
    assert_eq!(south.axes[0].direction, AxisDirection::NorthAlong(90));
    assert_eq!(south.axes[1].direction, AxisDirection::NorthAlong(0));
    assert_eq!(
        Projection::PolarStereographic { north: false }.epsg_code(),
        EPSG_UPS_SOUTH
    );
}

// ============================================================================
// Equivalence tests
// ============================================================================

#[test]
fn test_equivalent_ignores_names_and_ranges() {
    let a = SingleCrs::geographic(GeodeticDatum::wgs84(), true);
    let mut b = a.for_convention(AxesConvention::PositiveRange);
    b.name = "Unnamed".to_string();
    assert!(a.equivalent(&b));
    assert_ne!(a, b);
}

#[test]
fn test_equivalent_detects_other_datum() {
    let a = SingleCrs::geographic(GeodeticDatum::wgs84(), true);
    let b = SingleCrs::geographic(GeodeticDatum::sphere(6_371_007.0), true);
    assert!(!a.equivalent(&b));
    let grs = SingleCrs::geographic(GeodeticDatum::grs1980(), true);
    assert!(!a.equivalent(&grs));
}

#[test]
fn test_compound_equivalence() {
    let a = Crs::compound(vec![SingleCrs::wgs84(), temporal(Unit::Day)]).unwrap();
    let b = Crs::compound(vec![
        SingleCrs::wgs84().for_convention(AxesConvention::RightHanded),
        temporal(Unit::Day),
    ])
    .unwrap();
    let c = Crs::compound(vec![SingleCrs::wgs84(), temporal(Unit::Hour)]).unwrap();
    assert!(a.equivalent(&b));
    assert!(!a.equivalent(&c));
    assert_eq!(a.first_dimension_of(1), 2);
}

#[test]
fn test_compound_of_one_is_single() {
    let crs = Crs::compound(vec![SingleCrs::wgs84()]).unwrap();
    assert!(matches!(crs, Crs::Single(_)));
    assert!(Crs::compound(Vec::new()).is_err());
}

// ============================================================================
// Time units and bounding box tests
// ============================================================================

#[test]
fn test_time_units_offset() {
    let units = TimeUnits::parse("seconds since 1970-01-02").unwrap();
    assert_eq!(units.epoch_seconds_from_unix(), 86400.0);
    assert_eq!(units.seconds_per_unit(), 1.0);
}

#[test]
fn test_bbox_contains_and_intersects() {
    let a = BoundingBox::new(-10.0, -10.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 5.0, 20.0, 20.0);
    let c = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
    assert!(a.intersects(&b));
    assert!(!a.intersects(&c));
    assert!(a.contains_point(10.0, -10.0));
    assert!(!a.contains_point(10.1, 0.0));
}
