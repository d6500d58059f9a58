//! Coordinate axes built from coordinate variables.

use crate::axis_type::{AxisAbbreviation, AxisRole};
use crate::listeners::{DecoderEvent, Listeners};
use crate::variable::{Dimension, Variable};
use georef_common::{AxisDirection, AxisRange, CoordinateAxis, TimeUnits, Unit};
use std::sync::Arc;

/// Relative tolerance on the spacing of values for an axis to be considered regular.
const REGULAR_TOLERANCE: f64 = 1e-6;

/// A coordinate variable with its resolved kind, direction and unit.
///
/// Axes are immutable once created. Within one decoder, the `Arc<Axis>` pointer is
/// the identity used by the local grid cache.
#[derive(Debug)]
pub struct Axis {
    variable: Arc<Variable>,
    abbreviation: AxisAbbreviation,
    direction: AxisDirection,
    unit: Option<Unit>,
    time_units: Option<TimeUnits>,
}

impl Axis {
    /// Create an axis of the given kind.
    ///
    /// The direction is resolved from the kind, then from the direction suffix of the unit
    /// (`degrees_west`), then from the `positive` attribute. Sources that disagree on the
    /// line followed by the axis are reported and the earlier source wins.
    pub fn new(variable: Arc<Variable>, abbreviation: AxisAbbreviation, listeners: &Listeners) -> Self {
        let units = variable.units();
        let time_units = units.as_deref().and_then(TimeUnits::parse);
        let unit = time_units
            .map(|t| t.unit)
            .or_else(|| units.as_deref().and_then(Unit::parse));
        let direction = resolve_direction(&variable, abbreviation, unit, listeners);
        Self {
            variable,
            abbreviation,
            direction,
            unit,
            time_units,
        }
    }

    pub fn name(&self) -> &str {
        self.variable.name()
    }

    pub fn variable(&self) -> &Arc<Variable> {
        &self.variable
    }

    pub fn abbreviation(&self) -> AxisAbbreviation {
        self.abbreviation
    }

    pub fn role(&self) -> AxisRole {
        self.abbreviation.role()
    }

    pub fn direction(&self) -> AxisDirection {
        self.direction
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    /// Unit and epoch of a time axis.
    pub fn time_units(&self) -> Option<TimeUnits> {
        self.time_units
    }

    /// Dimensions of the coordinate variable, in netCDF order.
    pub fn dimensions(&self) -> &[Dimension] {
        self.variable.dimensions()
    }

    /// Coordinate values, empty if the variable contains text.
    pub fn values(&self) -> &[f64] {
        self.variable.values().unwrap_or(&[])
    }

    pub fn is_longitude(&self) -> bool {
        self.abbreviation == AxisAbbreviation::Longitude
    }

    pub fn is_latitude(&self) -> bool {
        self.abbreviation == AxisAbbreviation::Latitude
    }

    /// Whether longitude values use the [0°, 360°) convention.
    pub fn uses_positive_range(&self) -> bool {
        self.is_longitude() && self.values().iter().any(|v| *v > 180.0)
    }

    /// First value and constant increment of a one-dimensional axis, if values are
    /// evenly spaced.
    pub fn regular_spacing(&self) -> Option<(f64, f64)> {
        let values = self.values();
        if self.dimensions().len() != 1 || values.is_empty() {
            return None;
        }
        if values.len() == 1 {
            return values[0].is_finite().then_some((values[0], 1.0));
        }
        let n = values.len() - 1;
        let step = (values[n] - values[0]) / n as f64;
        if !step.is_finite() || step == 0.0 {
            return None;
        }
        let tolerance = step.abs() * REGULAR_TOLERANCE;
        values
            .iter()
            .enumerate()
            .all(|(i, v)| (v - (values[0] + step * i as f64)).abs() <= tolerance)
            .then_some((values[0], step))
    }

    /// The axis as it appears in a coordinate system.
    pub fn coordinate_axis(&self) -> CoordinateAxis {
        let axis = CoordinateAxis::new(
            self.name(),
            self.abbreviation.code(),
            self.direction,
            self.unit.unwrap_or(Unit::Unity),
        );
        match self.abbreviation {
            AxisAbbreviation::Longitude if self.uses_positive_range() => axis.with_range(AxisRange {
                min: 0.0,
                max: 360.0,
                wraparound: true,
            }),
            AxisAbbreviation::Longitude => axis.with_range(AxisRange {
                min: -180.0,
                max: 180.0,
                wraparound: true,
            }),
            _ => axis,
        }
    }
}

fn resolve_direction(
    variable: &Variable,
    abbreviation: AxisAbbreviation,
    unit: Option<Unit>,
    listeners: &Listeners,
) -> AxisDirection {
    let mut direction = abbreviation.direction();
    let check = |candidate: AxisDirection, direction: &mut AxisDirection| {
        if *direction == AxisDirection::Unspecified || candidate.is_colinear(direction) {
            *direction = candidate;
        } else {
            listeners.report(DecoderEvent::AmbiguousAxisDirection {
                variable: variable.name().to_string(),
                declared: candidate.to_string(),
                inferred: direction.to_string(),
            });
        }
    };
    if let Some(from_unit) = variable.units().as_deref().and_then(AxisDirection::from_units) {
        check(from_unit, &mut direction);
    }
    if direction == AxisDirection::Unspecified && unit.is_some_and(|u| u.is_pressure()) {
        direction = AxisDirection::Down;
    }
    if let Some(positive) = variable
        .attribute_as_string("positive")
        .and_then(|p| AxisDirection::from_name(&p))
    {
        check(positive, &mut direction);
    }
    direction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::CollectingListener;

    fn axis(variable: Variable, abbreviation: AxisAbbreviation) -> Axis {
        Axis::new(Arc::new(variable), abbreviation, &Listeners::new())
    }

    #[test]
    fn test_direction_from_positive_attribute() {
        let depth = Variable::new("lev", vec![Dimension::new("lev", 3)])
            .with_attributes(&[("units", "m"), ("positive", "down")]);
        assert_eq!(axis(depth, AxisAbbreviation::Z).direction(), AxisDirection::Down);

        let height = Variable::new("h", vec![Dimension::new("h", 3)])
            .with_attributes(&[("units", "m"), ("positive", "down")]);
        assert_eq!(axis(height, AxisAbbreviation::Height).direction(), AxisDirection::Down);
    }

    #[test]
    fn test_direction_from_unit_suffix() {
        let lon = Variable::new("x", vec![Dimension::new("x", 3)])
            .with_attribute("units", "degrees_west");
        assert_eq!(axis(lon, AxisAbbreviation::Longitude).direction(), AxisDirection::West);

        let pressure = Variable::new("p", vec![Dimension::new("p", 3)]).with_attribute("units", "hPa");
        assert_eq!(axis(pressure, AxisAbbreviation::Z).direction(), AxisDirection::Down);
    }

    #[test]
    fn test_inconsistent_direction_is_reported() {
        let collector = CollectingListener::new();
        let mut listeners = Listeners::new();
        listeners.add(collector.clone());
        let lat = Variable::new("lat", vec![Dimension::new("lat", 3)])
            .with_attributes(&[("units", "degrees_north"), ("positive", "up")]);
        let axis = Axis::new(Arc::new(lat), AxisAbbreviation::Latitude, &listeners);
        assert_eq!(axis.direction(), AxisDirection::North);
        let events = collector.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DecoderEvent::AmbiguousAxisDirection { .. }));
    }

    #[test]
    fn test_time_units() {
        let time = Variable::new("time", vec![Dimension::new("time", 2)])
            .with_attribute("units", "hours since 2000-01-01")
            .with_values(vec![0.0, 6.0]);
        let axis = axis(time, AxisAbbreviation::Time);
        assert_eq!(axis.unit(), Some(Unit::Hour));
        assert_eq!(axis.direction(), AxisDirection::Future);
        assert!(axis.time_units().is_some());
        assert_eq!(axis.regular_spacing(), Some((0.0, 6.0)));
    }

    #[test]
    fn test_regular_spacing() {
        let dim = Dimension::new("lon", 4);
        let regular = Variable::new("lon", vec![dim.clone()]).with_values(vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(axis(regular, AxisAbbreviation::Longitude).regular_spacing(), Some((0.0, 0.5)));

        let irregular = Variable::new("lon", vec![dim]).with_values(vec![0.0, 0.5, 1.5, 3.0]);
        assert_eq!(axis(irregular, AxisAbbreviation::Longitude).regular_spacing(), None);
    }

    #[test]
    fn test_positive_longitude_range() {
        let lon = Variable::new("lon", vec![Dimension::new("lon", 3)])
            .with_attribute("units", "degrees_east")
            .with_values(vec![0.0, 120.0, 240.0]);
        let axis = axis(lon, AxisAbbreviation::Longitude);
        assert!(axis.uses_positive_range());
        assert!(axis.coordinate_axis().uses_positive_range());
        assert_eq!(axis.coordinate_axis().abbreviation, "λ");
    }
}
