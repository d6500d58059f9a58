//! Coordinate Reference System model.
//!
//! A [`Crs`] is either a single coordinate system or a compound of several single ones
//! (for example a projected horizontal CRS followed by a temporal CRS). The model only
//! carries what is needed to assemble, compare and recombine the CRS inferred from netCDF
//! coordinate variables; the projection mathematics live in the `projection` crate.

use crate::error::{ReferencingError, ReferencingResult};
use crate::units::Unit;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG code of the WGS 84 geographic CRS with (latitude, longitude) axis order.
pub const EPSG_WGS84: u32 = 4326;
/// EPSG code of the UPS North projected CRS.
pub const EPSG_UPS_NORTH: u32 = 32661;
/// EPSG code of the UPS South projected CRS.
pub const EPSG_UPS_SOUTH: u32 = 32761;

/// Direction of a coordinate system axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisDirection {
    North,
    South,
    East,
    West,
    Up,
    Down,
    Future,
    Past,
    ColumnPositive,
    RowPositive,
    /// Toward south along the given meridian (degrees east), as used by north polar projections.
    SouthAlong(i16),
    /// Toward north along the given meridian (degrees east), as used by south polar projections.
    NorthAlong(i16),
    Unspecified,
}

impl AxisDirection {
    /// The direction of the line this axis follows, with a canonical sign.
    ///
    /// Two directions are colinear if and only if they have the same absolute direction.
    pub fn absolute(&self) -> AxisDirection {
        match *self {
            AxisDirection::South => AxisDirection::North,
            AxisDirection::West => AxisDirection::East,
            AxisDirection::Down => AxisDirection::Up,
            AxisDirection::Past => AxisDirection::Future,
            AxisDirection::SouthAlong(m) => AxisDirection::SouthAlong(m.rem_euclid(180)),
            AxisDirection::NorthAlong(m) => AxisDirection::SouthAlong((m + 180).rem_euclid(180)),
            other => other,
        }
    }

    /// The opposite direction, or the same direction if it has no opposite.
    pub fn opposite(&self) -> AxisDirection {
        match *self {
            AxisDirection::North => AxisDirection::South,
            AxisDirection::South => AxisDirection::North,
            AxisDirection::East => AxisDirection::West,
            AxisDirection::West => AxisDirection::East,
            AxisDirection::Up => AxisDirection::Down,
            AxisDirection::Down => AxisDirection::Up,
            AxisDirection::Future => AxisDirection::Past,
            AxisDirection::Past => AxisDirection::Future,
            AxisDirection::SouthAlong(m) => AxisDirection::NorthAlong(m),
            AxisDirection::NorthAlong(m) => AxisDirection::SouthAlong(m),
            other => other,
        }
    }

    /// Whether the two directions follow the same line, regardless of sign.
    pub fn is_colinear(&self, other: &AxisDirection) -> bool {
        *self != AxisDirection::Unspecified && self.absolute() == other.absolute()
    }

    /// Whether this direction is the opposite of its absolute direction.
    pub fn is_opposite(&self) -> bool {
        self.absolute() != *self
    }

    /// Parse a direction name such as `"north"`, `"up"` or `"E"` (case-insensitive).
    pub fn from_name(name: &str) -> Option<AxisDirection> {
        let direction = match name.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => AxisDirection::North,
            "south" | "s" => AxisDirection::South,
            "east" | "e" => AxisDirection::East,
            "west" | "w" => AxisDirection::West,
            "up" => AxisDirection::Up,
            "down" => AxisDirection::Down,
            "future" => AxisDirection::Future,
            "past" => AxisDirection::Past,
            _ => return None,
        };
        Some(direction)
    }

    /// Direction declared by the suffix of an angular unit, as in `"degrees_east"` or `"degree_N"`.
    ///
    /// Returns `None` when the unit has no suffix or the suffix is not a compass direction.
    pub fn from_units(units: &str) -> Option<AxisDirection> {
        let units = units.trim();
        let split = units.rfind(|c| c == '_' || c == ' ')?;
        match AxisDirection::from_name(&units[split + 1..])? {
            d @ (AxisDirection::North
            | AxisDirection::South
            | AxisDirection::East
            | AxisDirection::West) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Display for AxisDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisDirection::SouthAlong(m) => write!(f, "South along {}°E", m),
            AxisDirection::NorthAlong(m) => write!(f, "North along {}°E", m),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Range of valid values on an axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    /// Whether values wrap around (longitude).
    pub wraparound: bool,
}

/// One axis of a coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateAxis {
    pub name: String,
    pub abbreviation: String,
    pub direction: AxisDirection,
    pub unit: Unit,
    pub range: Option<AxisRange>,
}

impl CoordinateAxis {
    pub fn new(
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        direction: AxisDirection,
        unit: Unit,
    ) -> Self {
        Self {
            name: name.into(),
            abbreviation: abbreviation.into(),
            direction,
            unit,
            range: None,
        }
    }

    /// Geodetic longitude in degrees, range [-180°, 180°] with wraparound.
    pub fn longitude() -> Self {
        Self::new("Geodetic longitude", "λ", AxisDirection::East, Unit::Degree).with_range(
            AxisRange {
                min: -180.0,
                max: 180.0,
                wraparound: true,
            },
        )
    }

    /// Geodetic latitude in degrees, range [-90°, 90°].
    pub fn latitude() -> Self {
        Self::new("Geodetic latitude", "φ", AxisDirection::North, Unit::Degree).with_range(
            AxisRange {
                min: -90.0,
                max: 90.0,
                wraparound: false,
            },
        )
    }

    pub fn easting(direction: AxisDirection) -> Self {
        Self::new("Easting", "E", direction, Unit::Metre)
    }

    pub fn northing(direction: AxisDirection) -> Self {
        Self::new("Northing", "N", direction, Unit::Metre)
    }

    pub fn with_range(mut self, range: AxisRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Whether this axis is a longitude axis (angular, east-west).
    pub fn is_longitude(&self) -> bool {
        self.unit.is_angular() && self.direction.absolute() == AxisDirection::East
    }

    /// Whether values on this axis wrap around and start at zero (the [0°, 360°) convention).
    pub fn uses_positive_range(&self) -> bool {
        matches!(self.range, Some(r) if r.wraparound && r.min >= 0.0)
    }
}

/// Ellipsoid of a geodetic datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeodeticDatum {
    pub name: String,
    /// Semi-major axis in metres.
    pub semi_major_axis: f64,
    /// Inverse flattening, or infinity for a sphere.
    pub inverse_flattening: f64,
}

impl GeodeticDatum {
    pub fn wgs84() -> Self {
        Self {
            name: "World Geodetic System 1984".to_string(),
            semi_major_axis: 6_378_137.0,
            inverse_flattening: 298.257223563,
        }
    }

    pub fn grs1980() -> Self {
        Self {
            name: "Geodetic Reference System 1980".to_string(),
            semi_major_axis: 6_378_137.0,
            inverse_flattening: 298.257222101,
        }
    }

    pub fn sphere(radius: f64) -> Self {
        Self {
            name: "Sphere".to_string(),
            semi_major_axis: radius,
            inverse_flattening: f64::INFINITY,
        }
    }

    pub fn flattening(&self) -> f64 {
        if self.inverse_flattening.is_finite() && self.inverse_flattening != 0.0 {
            1.0 / self.inverse_flattening
        } else {
            0.0
        }
    }

    /// First eccentricity squared.
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }

    /// Compare ellipsoid parameters, ignoring the name.
    pub fn same_ellipsoid(&self, other: &GeodeticDatum) -> bool {
        (self.semi_major_axis - other.semi_major_axis).abs() < 1e-6
            && (self.flattening() - other.flattening()).abs() < 1e-12
    }
}

/// Map projections known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Projection {
    /// Universal Transverse Mercator zone (1-60) in the given hemisphere.
    TransverseMercator { zone: u8, north: bool },
    /// Universal Polar Stereographic on the given pole.
    PolarStereographic { north: bool },
}

impl Projection {
    /// EPSG code of the projected CRS using this projection on WGS 84.
    pub fn epsg_code(&self) -> u32 {
        match *self {
            Projection::TransverseMercator { zone, north: true } => 32600 + zone as u32,
            Projection::TransverseMercator { zone, north: false } => 32700 + zone as u32,
            Projection::PolarStereographic { north: true } => EPSG_UPS_NORTH,
            Projection::PolarStereographic { north: false } => EPSG_UPS_SOUTH,
        }
    }
}

/// Kind of a single CRS, with the parameters that define it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrsKind {
    Geographic {
        datum: GeodeticDatum,
    },
    /// A projected CRS. The projection is `None` when the conversion is unknown
    /// (coordinates are already projected but the file does not tell how).
    Projected {
        datum: GeodeticDatum,
        projection: Option<Projection>,
    },
    Vertical,
    Temporal {
        epoch: Option<NaiveDateTime>,
    },
    /// Grid or other coordinates without geodetic meaning.
    Engineering,
}

impl CrsKind {
    /// Compare the defining parameters, ignoring names.
    pub fn equivalent(&self, other: &CrsKind) -> bool {
        match (self, other) {
            (CrsKind::Geographic { datum: a }, CrsKind::Geographic { datum: b }) => {
                a.same_ellipsoid(b)
            }
            (
                CrsKind::Projected {
                    datum: a,
                    projection: pa,
                },
                CrsKind::Projected {
                    datum: b,
                    projection: pb,
                },
            ) => a.same_ellipsoid(b) && pa == pb,
            (CrsKind::Vertical, CrsKind::Vertical) => true,
            (CrsKind::Temporal { epoch: a }, CrsKind::Temporal { epoch: b }) => a == b,
            (CrsKind::Engineering, CrsKind::Engineering) => true,
            _ => false,
        }
    }
}

/// Convention applied to the axes of an existing CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxesConvention {
    /// Longitude values in [0°, 360°).
    PositiveRange,
    /// Horizontal axes in (east, north) order.
    RightHanded,
}

/// A CRS made of a single coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleCrs {
    pub name: String,
    /// EPSG code, if the CRS is a known authority definition.
    pub identifier: Option<u32>,
    pub kind: CrsKind,
    pub axes: Vec<CoordinateAxis>,
}

impl SingleCrs {
    /// Geographic CRS on the given datum. Axis order is (latitude, longitude) unless
    /// `longitude_first` is set.
    pub fn geographic(datum: GeodeticDatum, longitude_first: bool) -> Self {
        let axes = if longitude_first {
            vec![CoordinateAxis::longitude(), CoordinateAxis::latitude()]
        } else {
            vec![CoordinateAxis::latitude(), CoordinateAxis::longitude()]
        };
        let wgs84 = datum.same_ellipsoid(&GeodeticDatum::wgs84());
        Self {
            name: if wgs84 { "WGS 84".to_string() } else { datum.name.clone() },
            identifier: (wgs84 && !longitude_first).then_some(EPSG_WGS84),
            kind: CrsKind::Geographic { datum },
            axes,
        }
    }

    /// The WGS 84 geographic CRS as defined by EPSG (latitude first).
    pub fn wgs84() -> Self {
        Self::geographic(GeodeticDatum::wgs84(), false)
    }

    /// A projected CRS on WGS 84 using one of the universal projections.
    pub fn universal(projection: Projection) -> Self {
        let (name, axes) = match projection {
            Projection::TransverseMercator { zone, north } => (
                format!("WGS 84 / UTM zone {}{}", zone, if north { 'N' } else { 'S' }),
                vec![
                    CoordinateAxis::easting(AxisDirection::East),
                    CoordinateAxis::northing(AxisDirection::North),
                ],
            ),
            Projection::PolarStereographic { north: true } => (
                "WGS 84 / UPS North (E,N)".to_string(),
                vec![
                    CoordinateAxis::easting(AxisDirection::SouthAlong(90)),
                    CoordinateAxis::northing(AxisDirection::SouthAlong(180)),
                ],
            ),
            Projection::PolarStereographic { north: false } => (
                "WGS 84 / UPS South (E,N)".to_string(),
                vec![
                    CoordinateAxis::easting(AxisDirection::NorthAlong(90)),
                    CoordinateAxis::northing(AxisDirection::NorthAlong(0)),
                ],
            ),
        };
        Self {
            name,
            identifier: Some(projection.epsg_code()),
            kind: CrsKind::Projected {
                datum: GeodeticDatum::wgs84(),
                projection: Some(projection),
            },
            axes,
        }
    }

    /// Create a CRS from an EPSG code.
    ///
    /// Supported codes are 4326, the UTM zones 32601-32660 and 32701-32760,
    /// and the UPS codes 32661 and 32761.
    pub fn from_epsg(code: u32) -> ReferencingResult<Self> {
        match code {
            EPSG_WGS84 => Ok(Self::wgs84()),
            EPSG_UPS_NORTH => Ok(Self::universal(Projection::PolarStereographic { north: true })),
            EPSG_UPS_SOUTH => Ok(Self::universal(Projection::PolarStereographic { north: false })),
            32601..=32660 => Ok(Self::universal(Projection::TransverseMercator {
                zone: (code - 32600) as u8,
                north: true,
            })),
            32701..=32760 => Ok(Self::universal(Projection::TransverseMercator {
                zone: (code - 32700) as u8,
                north: false,
            })),
            _ => Err(ReferencingError::UnsupportedCode(format!("EPSG:{}", code))),
        }
    }

    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// The datum, if this CRS is geographic or projected.
    pub fn datum(&self) -> Option<&GeodeticDatum> {
        match &self.kind {
            CrsKind::Geographic { datum } | CrsKind::Projected { datum, .. } => Some(datum),
            _ => None,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self.kind, CrsKind::Geographic { .. })
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(
            self.kind,
            CrsKind::Geographic { .. } | CrsKind::Projected { .. }
        )
    }

    /// Compare with another CRS ignoring names, axis order and axis ranges.
    pub fn equivalent(&self, other: &SingleCrs) -> bool {
        if !self.kind.equivalent(&other.kind) || self.axes.len() != other.axes.len() {
            return false;
        }
        let mut unmatched: Vec<&CoordinateAxis> = other.axes.iter().collect();
        for axis in &self.axes {
            match unmatched
                .iter()
                .position(|o| o.unit == axis.unit && o.direction == axis.direction)
            {
                Some(i) => {
                    unmatched.swap_remove(i);
                }
                None => return false,
            }
        }
        true
    }

    /// Apply an axes convention to this CRS.
    pub fn for_convention(&self, convention: AxesConvention) -> SingleCrs {
        let mut crs = self.clone();
        match convention {
            AxesConvention::RightHanded => {
                if crs.is_horizontal() {
                    crs.axes.sort_by_key(|a| match a.direction.absolute() {
                        AxisDirection::East => 0,
                        AxisDirection::North => 1,
                        _ => 2,
                    });
                    if crs.axes != self.axes {
                        crs.identifier = None;
                    }
                }
            }
            AxesConvention::PositiveRange => {
                for axis in crs.axes.iter_mut().filter(|a| a.is_longitude()) {
                    axis.range = Some(AxisRange {
                        min: 0.0,
                        max: 360.0,
                        wraparound: true,
                    });
                }
            }
        }
        crs
    }
}

impl fmt::Display for SingleCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identifier {
            Some(code) => write!(f, "{} (EPSG:{})", self.name, code),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A coordinate reference system, single or compound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Crs {
    Single(SingleCrs),
    Compound {
        name: String,
        components: Vec<SingleCrs>,
    },
}

impl Crs {
    /// Build a CRS from its components. A single component is not wrapped in a compound.
    pub fn compound(mut components: Vec<SingleCrs>) -> ReferencingResult<Crs> {
        match components.len() {
            0 => Err(ReferencingError::MismatchedDimension {
                expected: 1,
                actual: 0,
            }),
            1 => Ok(Crs::Single(components.remove(0))),
            _ => {
                let name = components
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ");
                Ok(Crs::Compound { name, components })
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Crs::Single(crs) => &crs.name,
            Crs::Compound { name, .. } => name,
        }
    }

    pub fn components(&self) -> &[SingleCrs] {
        match self {
            Crs::Single(crs) => std::slice::from_ref(crs),
            Crs::Compound { components, .. } => components,
        }
    }

    pub fn dimension(&self) -> usize {
        self.components().iter().map(|c| c.dimension()).sum()
    }

    /// All axes, in CRS order.
    pub fn axes(&self) -> impl Iterator<Item = &CoordinateAxis> {
        self.components().iter().flat_map(|c| c.axes.iter())
    }

    /// Index of the first dimension where the axes of `other` appear consecutively,
    /// in the same order and with colinear directions.
    pub fn index_of_colinear(&self, other: &Crs) -> Option<usize> {
        let axes: Vec<_> = self.axes().collect();
        let sub: Vec<_> = other.axes().collect();
        if sub.is_empty() || sub.len() > axes.len() {
            return None;
        }
        (0..=axes.len() - sub.len()).find(|&i| {
            sub.iter()
                .enumerate()
                .all(|(j, a)| axes[i + j].direction.is_colinear(&a.direction))
        })
    }

    /// Compare with another CRS ignoring names, axis order within components and axis ranges.
    pub fn equivalent(&self, other: &Crs) -> bool {
        let a = self.components();
        let b = other.components();
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
    }

    /// Apply an axes convention to every component.
    pub fn for_convention(&self, convention: AxesConvention) -> Crs {
        match self {
            Crs::Single(crs) => Crs::Single(crs.for_convention(convention)),
            Crs::Compound { name, components } => Crs::Compound {
                name: name.clone(),
                components: components
                    .iter()
                    .map(|c| c.for_convention(convention))
                    .collect(),
            },
        }
    }

    /// Index of the first dimension of the component at `index`.
    pub fn first_dimension_of(&self, index: usize) -> usize {
        self.components()[..index]
            .iter()
            .map(|c| c.dimension())
            .sum()
    }
}

impl From<SingleCrs> for Crs {
    fn from(crs: SingleCrs) -> Self {
        Crs::Single(crs)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Single(crs) => write!(f, "{}", crs),
            Crs::Compound { name, .. } => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colinear_directions() {
        assert!(AxisDirection::East.is_colinear(&AxisDirection::West));
        assert!(!AxisDirection::East.is_colinear(&AxisDirection::North));
        assert!(AxisDirection::SouthAlong(90).is_colinear(&AxisDirection::NorthAlong(-90)));
        assert!(AxisDirection::SouthAlong(90).is_colinear(&AxisDirection::SouthAlong(270)));
        assert!(!AxisDirection::SouthAlong(90).is_colinear(&AxisDirection::SouthAlong(180)));
        assert!(!AxisDirection::Unspecified.is_colinear(&AxisDirection::Unspecified));
    }

    #[test]
    fn test_direction_from_units() {
        assert_eq!(AxisDirection::from_units("degrees_east"), Some(AxisDirection::East));
        assert_eq!(AxisDirection::from_units("degree_N"), Some(AxisDirection::North));
        assert_eq!(AxisDirection::from_units("degrees west"), Some(AxisDirection::West));
        assert_eq!(AxisDirection::from_units("degrees"), None);
        assert_eq!(AxisDirection::from_units("km_up"), None);
    }

    #[test]
    fn test_from_epsg() {
        let wgs84 = SingleCrs::from_epsg(4326).unwrap();
        assert!(wgs84.is_geographic());
        assert_eq!(wgs84.axes[0].direction, AxisDirection::North);

        let utm = SingleCrs::from_epsg(32633).unwrap();
        assert_eq!(
            utm.kind,
            CrsKind::Projected {
                datum: GeodeticDatum::wgs84(),
                projection: Some(Projection::TransverseMercator {
                    zone: 33,
                    north: true
                }),
            }
        );
        assert_eq!(utm.name, "WGS 84 / UTM zone 33N");

        assert!(SingleCrs::from_epsg(3857).is_err());
    }

    #[test]
    fn test_right_handed_swaps_geographic_axes() {
        let wgs84 = SingleCrs::wgs84();
        let rh = wgs84.for_convention(AxesConvention::RightHanded);
        assert_eq!(rh.axes[0].direction, AxisDirection::East);
        assert_eq!(rh.identifier, None);
        assert!(rh.equivalent(&wgs84));
    }

    #[test]
    fn test_positive_range() {
        let crs = SingleCrs::geographic(GeodeticDatum::wgs84(), true);
        assert!(!crs.axes[0].uses_positive_range());
        let shifted = crs.for_convention(AxesConvention::PositiveRange);
        assert!(shifted.axes[0].uses_positive_range());
        assert!(!shifted.axes[1].uses_positive_range());
    }

    #[test]
    fn test_index_of_colinear() {
        let time = SingleCrs {
            name: "time".to_string(),
            identifier: None,
            kind: CrsKind::Temporal { epoch: None },
            axes: vec![CoordinateAxis::new("time", "t", AxisDirection::Future, Unit::Day)],
        };
        let compound =
            Crs::compound(vec![SingleCrs::geographic(GeodeticDatum::wgs84(), true), time])
                .unwrap();
        assert_eq!(compound.dimension(), 3);
        let wgs84 = Crs::from(SingleCrs::wgs84());
        assert_eq!(compound.index_of_colinear(&wgs84), None);
        let rh = wgs84.for_convention(AxesConvention::RightHanded);
        assert_eq!(compound.index_of_colinear(&rh), Some(0));
    }
}
