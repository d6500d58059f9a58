//! Implicit CRS inferred from the axes of a grid.

use crate::axis::Axis;
use crate::axis_type::{AxisAbbreviation, AxisRole};
use georef_common::{AxesConvention, Crs, CrsKind, GeodeticDatum, ReferencingResult, SingleCrs};
use std::sync::Arc;

/// Builds a CRS with one component per group of related axes.
pub struct CrsBuilder;

impl CrsBuilder {
    /// Build the CRS of axes given in CRS order.
    ///
    /// Consecutive longitude and latitude axes form a geographic component, consecutive
    /// easting and northing axes a projected one with unknown conversion. Other axes give
    /// vertical, temporal or engineering components of one dimension.
    pub fn build(axes: &[Arc<Axis>], datum: &GeodeticDatum) -> ReferencingResult<Crs> {
        let mut components = Vec::new();
        let mut i = 0;
        while i < axes.len() {
            let axis = &axes[i];
            if let Some(next) = axes.get(i + 1) {
                if let Some(crs) = horizontal(axis, next, datum) {
                    components.push(crs);
                    i += 2;
                    continue;
                }
            }
            components.push(single(axis));
            i += 1;
        }
        Crs::compound(components)
    }
}

fn horizontal(first: &Axis, second: &Axis, datum: &GeodeticDatum) -> Option<SingleCrs> {
    use AxisAbbreviation::*;
    match (first.abbreviation(), second.abbreviation()) {
        (Longitude, Latitude) | (Latitude, Longitude) => {
            let crs = SingleCrs::geographic(datum.clone(), first.is_longitude());
            if first.uses_positive_range() || second.uses_positive_range() {
                Some(crs.for_convention(AxesConvention::PositiveRange))
            } else {
                Some(crs)
            }
        }
        (Easting, Northing) | (Northing, Easting) => Some(SingleCrs {
            name: "Unknown projected CRS".to_string(),
            identifier: None,
            kind: CrsKind::Projected {
                datum: datum.clone(),
                projection: None,
            },
            axes: vec![first.coordinate_axis(), second.coordinate_axis()],
        }),
        _ => None,
    }
}

fn single(axis: &Axis) -> SingleCrs {
    let kind = match axis.role() {
        AxisRole::T => CrsKind::Temporal {
            epoch: axis.time_units().map(|t| t.epoch),
        },
        AxisRole::Z => CrsKind::Vertical,
        AxisRole::X | AxisRole::Y => CrsKind::Engineering,
    };
    SingleCrs {
        name: axis.name().to_string(),
        identifier: None,
        kind,
        axes: vec![axis.coordinate_axis()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::Listeners;
    use crate::variable::{Dimension, Variable};
    use georef_common::AxisDirection;

    fn axis(name: &str, abbreviation: AxisAbbreviation, units: &str, values: Vec<f64>) -> Arc<Axis> {
        let var = Variable::new(name, vec![Dimension::new(name, values.len())])
            .with_attribute("units", units)
            .with_values(values);
        Arc::new(Axis::new(Arc::new(var), abbreviation, &Listeners::new()))
    }

    #[test]
    fn test_geographic_vertical_temporal() {
        let axes = vec![
            axis("lon", AxisAbbreviation::Longitude, "degrees_east", vec![0.0, 1.0]),
            axis("lat", AxisAbbreviation::Latitude, "degrees_north", vec![0.0, 1.0]),
            axis("depth", AxisAbbreviation::Depth, "m", vec![0.0, 10.0]),
            axis("time", AxisAbbreviation::Time, "days since 2000-01-01", vec![0.0, 1.0]),
        ];
        let crs = CrsBuilder::build(&axes, &GeodeticDatum::wgs84()).unwrap();
        let components = crs.components();
        assert_eq!(components.len(), 3);
        assert!(components[0].is_geographic());
        assert!(components[0].axes[0].is_longitude());
        assert_eq!(components[1].kind, CrsKind::Vertical);
        assert_eq!(components[1].axes[0].direction, AxisDirection::Down);
        match &components[2].kind {
            CrsKind::Temporal { epoch } => assert_eq!(epoch.unwrap().to_string(), "2000-01-01 00:00:00"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(crs.dimension(), 4);
    }

    #[test]
    fn test_positive_longitude_range() {
        let axes = vec![
            axis("lat", AxisAbbreviation::Latitude, "degrees_north", vec![-10.0, 10.0]),
            axis("lon", AxisAbbreviation::Longitude, "degrees_east", vec![170.0, 190.0]),
        ];
        let crs = CrsBuilder::build(&axes, &GeodeticDatum::wgs84()).unwrap();
        let longitude = &crs.components()[0].axes[1];
        assert!(longitude.is_longitude());
        assert!(longitude.uses_positive_range());
    }

    #[test]
    fn test_projected_and_engineering() {
        let axes = vec![
            axis("x", AxisAbbreviation::Easting, "m", vec![0.0, 1.0]),
            axis("y", AxisAbbreviation::Northing, "m", vec![0.0, 1.0]),
            axis("band", AxisAbbreviation::X, "1", vec![0.0, 1.0]),
        ];
        let crs = CrsBuilder::build(&axes, &GeodeticDatum::wgs84()).unwrap();
        assert!(matches!(crs.components()[0].kind, CrsKind::Projected { projection: None, .. }));
        assert_eq!(crs.components()[1].kind, CrsKind::Engineering);
    }
}
