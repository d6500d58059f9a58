//! Classification of coordinate variables into axis kinds.
//!
//! The classification is a chain of strategies ordered from the most to the least
//! authoritative source of information. Each strategy answers with a definitive kind,
//! an ambiguous kind (the generic `x`, `y` or `z`) or nothing. The chain stops at the
//! first definitive answer; otherwise the first ambiguous answer seen is returned.

use crate::variable::Variable;
use georef_common::{AxisDirection, Unit};
use std::fmt;

/// Kind of a coordinate axis, as a closed vocabulary of abbreviations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisAbbreviation {
    /// Geodetic longitude (λ).
    Longitude,
    /// Geodetic latitude (φ).
    Latitude,
    /// Height above the ellipsoid or a vertical datum (H).
    Height,
    /// Depth below the surface (D).
    Depth,
    /// Projected easting (E).
    Easting,
    /// Projected northing (N).
    Northing,
    /// Time (t).
    Time,
    /// Generic horizontal x.
    X,
    /// Generic horizontal y.
    Y,
    /// Generic vertical z.
    Z,
}

/// Canonical role of an axis, ordered as axes appear in a CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisRole {
    X,
    Y,
    Z,
    T,
}

impl AxisAbbreviation {
    /// Abbreviation code, as used in CRS axis definitions.
    pub fn code(&self) -> &'static str {
        match self {
            AxisAbbreviation::Longitude => "λ",
            AxisAbbreviation::Latitude => "φ",
            AxisAbbreviation::Height => "H",
            AxisAbbreviation::Depth => "D",
            AxisAbbreviation::Easting => "E",
            AxisAbbreviation::Northing => "N",
            AxisAbbreviation::Time => "t",
            AxisAbbreviation::X => "x",
            AxisAbbreviation::Y => "y",
            AxisAbbreviation::Z => "z",
        }
    }

    pub fn role(&self) -> AxisRole {
        match self {
            AxisAbbreviation::Longitude | AxisAbbreviation::Easting | AxisAbbreviation::X => {
                AxisRole::X
            }
            AxisAbbreviation::Latitude | AxisAbbreviation::Northing | AxisAbbreviation::Y => {
                AxisRole::Y
            }
            AxisAbbreviation::Height | AxisAbbreviation::Depth | AxisAbbreviation::Z => {
                AxisRole::Z
            }
            AxisAbbreviation::Time => AxisRole::T,
        }
    }

    /// Whether this is one of the generic `x`, `y`, `z` codes, never trusted as a final answer.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            AxisAbbreviation::X | AxisAbbreviation::Y | AxisAbbreviation::Z
        )
    }

    /// Direction implied by this kind of axis.
    pub fn direction(&self) -> AxisDirection {
        match self {
            AxisAbbreviation::Longitude | AxisAbbreviation::Easting => AxisDirection::East,
            AxisAbbreviation::Latitude | AxisAbbreviation::Northing => AxisDirection::North,
            AxisAbbreviation::Height => AxisDirection::Up,
            AxisAbbreviation::Depth => AxisDirection::Down,
            AxisAbbreviation::Time => AxisDirection::Future,
            AxisAbbreviation::X | AxisAbbreviation::Y | AxisAbbreviation::Z => {
                AxisDirection::Unspecified
            }
        }
    }

    /// Whether this kind of axis is geographic (longitude or latitude).
    pub fn is_geographic(&self) -> bool {
        matches!(self, AxisAbbreviation::Longitude | AxisAbbreviation::Latitude)
    }

    /// Look up a name among the known synonyms, ignoring case.
    pub fn from_name(name: &str) -> Option<AxisAbbreviation> {
        let abbreviation = match name.trim().to_ascii_lowercase().as_str() {
            "longitude" | "lon" | "long" => AxisAbbreviation::Longitude,
            "latitude" | "lat" => AxisAbbreviation::Latitude,
            "height" | "altitude" | "elevation" => AxisAbbreviation::Height,
            "depth" => AxisAbbreviation::Depth,
            "time" | "runtime" | "reftime" => AxisAbbreviation::Time,
            "projection_x_coordinate" | "easting" => AxisAbbreviation::Easting,
            "projection_y_coordinate" | "northing" => AxisAbbreviation::Northing,
            "x" | "geox" => AxisAbbreviation::X,
            "y" | "geoy" => AxisAbbreviation::Y,
            "z" | "geoz" | "pressure" => AxisAbbreviation::Z,
            _ => return None,
        };
        Some(abbreviation)
    }

    /// Map a value of the UCAR `_CoordinateAxisType` attribute.
    pub fn from_coordinate_axis_type(value: &str) -> Option<AxisAbbreviation> {
        let abbreviation = match value.trim().to_ascii_lowercase().as_str() {
            "lon" => AxisAbbreviation::Longitude,
            "lat" => AxisAbbreviation::Latitude,
            "height" => AxisAbbreviation::Height,
            "pressure" => AxisAbbreviation::Z,
            "time" | "runtime" => AxisAbbreviation::Time,
            "geox" => AxisAbbreviation::X,
            "geoy" => AxisAbbreviation::Y,
            "geoz" => AxisAbbreviation::Z,
            _ => return None,
        };
        Some(abbreviation)
    }
}

impl fmt::Display for AxisAbbreviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Answer of one classification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Definitive(AxisAbbreviation),
    Ambiguous(AxisAbbreviation),
    NoMatch,
}

impl From<Option<AxisAbbreviation>> for Classification {
    fn from(abbreviation: Option<AxisAbbreviation>) -> Self {
        match abbreviation {
            Some(a) if a.is_ambiguous() => Classification::Ambiguous(a),
            Some(a) => Classification::Definitive(a),
            None => Classification::NoMatch,
        }
    }
}

/// A classification strategy: variable and "unit inspection allowed" flag to answer.
type Strategy = fn(&Variable, bool) -> Classification;

/// Strategies in decreasing order of authority.
const STRATEGIES: [Strategy; 6] = [
    by_coordinate_axis_type,
    by_standard_name,
    by_description,
    by_angular_unit,
    by_variable_name,
    by_other_unit,
];

/// Text attributes searched for a description of the axis, in order.
const DESCRIPTION_ATTRIBUTES: [&str; 3] = ["long_name", "description", "title"];

/// Classifies coordinate variables into axis kinds and roles.
pub struct AxisRoleResolver;

impl AxisRoleResolver {
    /// Abbreviation of the axis described by the given variable, or `None` if unknown.
    ///
    /// `use_unit` allows the unit of measurement to be inspected.
    pub fn abbreviation(variable: &Variable, use_unit: bool) -> Option<AxisAbbreviation> {
        first_definitive(STRATEGIES.iter().map(|s| s(variable, use_unit)))
    }

    /// Role of the axis described by the given variable, or `None` if unknown.
    pub fn role(variable: &Variable, use_unit: bool) -> Option<AxisRole> {
        Self::abbreviation(variable, use_unit).map(|a| a.role())
    }
}

/// Return the first definitive answer, or else the first ambiguous one.
pub fn first_definitive<I>(answers: I) -> Option<AxisAbbreviation>
where
    I: IntoIterator<Item = Classification>,
{
    let mut fallback = None;
    for answer in answers {
        match answer {
            Classification::Definitive(a) => return Some(a),
            Classification::Ambiguous(a) => {
                if fallback.is_none() {
                    fallback = Some(a);
                }
            }
            Classification::NoMatch => {}
        }
    }
    fallback
}

fn by_coordinate_axis_type(variable: &Variable, _: bool) -> Classification {
    variable
        .attribute_as_string("_CoordinateAxisType")
        .and_then(|v| AxisAbbreviation::from_coordinate_axis_type(&v))
        .into()
}

fn by_standard_name(variable: &Variable, _: bool) -> Classification {
    variable
        .attribute_as_string("standard_name")
        .and_then(|v| AxisAbbreviation::from_name(&v))
        .into()
}

/// Free text: the whole phrase first, then its leading word.
fn by_description(variable: &Variable, _: bool) -> Classification {
    let answers = DESCRIPTION_ATTRIBUTES.iter().filter_map(|name| {
        let text = variable.attribute_as_string(name)?;
        let whole = AxisAbbreviation::from_name(&text);
        let leading = || {
            text.split(|c: char| !c.is_alphanumeric() && c != '_')
                .find(|w| !w.is_empty())
                .and_then(AxisAbbreviation::from_name)
        };
        Some(Classification::from(whole.or_else(leading)))
    });
    match first_definitive(answers) {
        Some(a) => Classification::from(Some(a)),
        None => Classification::NoMatch,
    }
}

fn by_angular_unit(variable: &Variable, use_unit: bool) -> Classification {
    if !use_unit {
        return Classification::NoMatch;
    }
    let Some(units) = variable.units() else {
        return Classification::NoMatch;
    };
    if !Unit::parse(&units).is_some_and(|u| u.is_angular()) {
        return Classification::NoMatch;
    }
    match AxisDirection::from_units(&units).map(|d| d.absolute()) {
        Some(AxisDirection::East) => Classification::Definitive(AxisAbbreviation::Longitude),
        Some(AxisDirection::North) => Classification::Definitive(AxisAbbreviation::Latitude),
        _ => Classification::NoMatch,
    }
}

fn by_variable_name(variable: &Variable, _: bool) -> Classification {
    AxisAbbreviation::from_name(variable.name()).into()
}

fn by_other_unit(variable: &Variable, use_unit: bool) -> Classification {
    if !use_unit {
        return Classification::NoMatch;
    }
    match variable.units().and_then(|u| Unit::parse(&u)) {
        Some(u) if u.is_temporal() => Classification::Definitive(AxisAbbreviation::Time),
        Some(u) if u.is_pressure() => Classification::Ambiguous(AxisAbbreviation::Z),
        _ => Classification::NoMatch,
    }
}
