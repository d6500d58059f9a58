//! Projections proposed to make localization grids more linear.
//!
//! A localization grid of longitudes and latitudes is often far from affine, for example
//! near the poles or when a satellite swath is curved. Projecting the control points to a
//! suitable map projection before fitting the grid may give a much more linear result.
//! The [`Linearizer`]s created here register their candidate projections on a
//! [`LocalizationGridBuilder`], which keeps the one giving the most linear fit.

use georef_common::{
    BoundingBox, CoordinateAxis, CrsKind, Projection, ReferencingError, ReferencingResult,
    SingleCrs,
};
use nalgebra::DMatrix;
use projection::referencing::ZONE_WIDTH;
use projection::{transform, universal_projection, universal_transform, LocalizationGridBuilder, SwapAxes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Latitude beyond which the poleward edge of a grid, rather than its center, selects
/// the projection.
pub const POLAR_THRESHOLD: f64 = 60.0;

/// Longitude span from which universal projections become unstable.
pub const UNSTABLE_SPAN: f64 = 180.0 - ZONE_WIDTH;

/// Kind of linearization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearizerKind {
    /// UTM or UPS projection selected from the location of the grid.
    Universal,
}

impl LinearizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinearizerKind::Universal => "universal",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "universal" | "utm" | "ups" => Some(LinearizerKind::Universal),
            _ => None,
        }
    }

    /// Parse a comma-separated list. `"none"` and unknown names are ignored.
    pub fn parse_list(s: &str) -> BTreeSet<Self> {
        s.split(',').filter_map(Self::from_str).collect()
    }
}

impl fmt::Display for LinearizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A linearization candidate and the state accumulated while computing it.
#[derive(Debug, Clone)]
pub struct Linearizer {
    kind: LinearizerKind,
    target: SingleCrs,
    axis_swap: bool,
    longitude_span: f64,
    reference_point: (f64, f64),
}

impl Linearizer {
    /// Compute one candidate per requested kind and register them on the builder.
    ///
    /// The builder control points are (longitude, latitude) if `longitude_first` is set,
    /// or (latitude, longitude) otherwise. Candidate transforms consume the control points
    /// in that order and produce projected coordinates in the same order (easting paired
    /// with longitude). Linearizers are returned in registration order.
    pub fn set_candidates_on_grid(
        kinds: &BTreeSet<LinearizerKind>,
        builder: &mut LocalizationGridBuilder,
        longitude_first: bool,
    ) -> Vec<Linearizer> {
        let mut linearizers = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let linearizer = match kind {
                LinearizerKind::Universal => Self::universal(builder, longitude_first),
            };
            let Some(projection) = linearizer.projection() else {
                continue;
            };
            let candidate = SwapAxes {
                inner: universal_transform(projection),
                swap_input: longitude_first,
                swap_output: !longitude_first,
            };
            debug!(
                kind = %kind,
                target = %linearizer.target.name,
                span = linearizer.longitude_span,
                "Registered linearizer candidate"
            );
            builder.add_linearizer(linearizer.target.name.clone(), Arc::new(candidate));
            linearizers.push(linearizer);
        }
        linearizers
    }

    fn universal(builder: &LocalizationGridBuilder, longitude_first: bool) -> Self {
        let (w, h) = (builder.width(), builder.height());
        let samples = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1), (w / 2, h / 2)];
        let bbox = BoundingBox::from_points(samples.iter().map(|&(x, y)| {
            let (a, b) = builder.control_point(x, y);
            if longitude_first {
                (a, b)
            } else {
                (b, a)
            }
        }));
        let (longitude, center_latitude) = bbox.center();
        let latitude = if bbox.min_y > POLAR_THRESHOLD {
            bbox.max_y
        } else if bbox.max_y < -POLAR_THRESHOLD {
            bbox.min_y
        } else {
            center_latitude
        };
        Self {
            kind: LinearizerKind::Universal,
            target: SingleCrs::universal(universal_projection(latitude, longitude)),
            axis_swap: longitude_first,
            longitude_span: bbox.width(),
            reference_point: (latitude, longitude),
        }
    }

    pub fn kind(&self) -> LinearizerKind {
        self.kind
    }

    /// The projected CRS produced by this candidate.
    pub fn target_crs(&self) -> &SingleCrs {
        &self.target
    }

    fn projection(&self) -> Option<Projection> {
        match &self.target.kind {
            CrsKind::Projected { projection, .. } => *projection,
            _ => None,
        }
    }

    /// Whether the caller's axis order had to be swapped to (latitude, longitude).
    pub fn axis_swap(&self) -> bool {
        self.axis_swap
    }

    /// Longitude span of the grid bounding box, in degrees.
    pub fn longitude_span(&self) -> f64 {
        self.longitude_span
    }

    /// The (latitude, longitude) point used to select the projection.
    pub fn reference_point(&self) -> (f64, f64) {
        self.reference_point
    }

    /// A diagnostic of why fitting may have failed, if the grid is too wide for the projection.
    pub fn potential_cause(&self) -> Option<String> {
        (self.longitude_span >= UNSTABLE_SPAN).then(|| {
            format!(
                "the longitude span of {:.1}° may be too wide for {}",
                self.longitude_span, self.target.name
            )
        })
    }
}

/// A projected CRS to substitute for the geographic component starting at a given dimension.
#[derive(Debug, Clone)]
pub struct Replacement {
    pub first_dimension: usize,
    pub target: SingleCrs,
}

/// Substitute projected CRS for the geographic components they linearize.
///
/// Target axes are matched to source axes by colinear direction, or else by horizontal
/// role for polar axes whose directions are relative to a meridian. When `affine` is given
/// and the target axis order differs from the source one, the rows of the matrix are
/// permuted so that its output follows the target order.
pub fn replace_in_compound_crs(
    components: &mut [SingleCrs],
    replacements: &[Replacement],
    mut affine: Option<&mut DMatrix<f64>>,
) -> ReferencingResult<()> {
    for replacement in replacements {
        let mut first = 0;
        let index = components.iter().position(|c| {
            let start = first;
            first += c.dimension();
            start == replacement.first_dimension
                && c.is_geographic()
                && c.dimension() == replacement.target.dimension()
        });
        let names = || {
            components
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(" + ")
        };
        let Some(index) = index else {
            return Err(ReferencingError::cannot_inject(
                replacement.target.name.clone(),
                names(),
            ));
        };
        let source = &components[index].axes;
        let target = &replacement.target.axes;
        let Some(order) = match_strict(source, target).or_else(|| match_lenient(source, target))
        else {
            return Err(ReferencingError::cannot_inject(
                replacement.target.name.clone(),
                names(),
            ));
        };
        if let Some(matrix) = affine.as_deref_mut() {
            if order.iter().enumerate().any(|(k, &o)| k != o) {
                transform::permute_rows(matrix, replacement.first_dimension, &order);
            }
        }
        components[index] = replacement.target.clone();
    }
    Ok(())
}

/// For each target axis, the index of the source axis with a colinear direction.
fn match_strict(source: &[CoordinateAxis], target: &[CoordinateAxis]) -> Option<Vec<usize>> {
    match_by(source, target, |s, t| s.direction.is_colinear(&t.direction))
}

/// For each target axis, the index of the source axis playing the same horizontal role.
fn match_lenient(source: &[CoordinateAxis], target: &[CoordinateAxis]) -> Option<Vec<usize>> {
    fn role(axis: &CoordinateAxis) -> Option<u8> {
        match axis.abbreviation.as_str() {
            "λ" | "E" | "x" => Some(0),
            "φ" | "N" | "y" => Some(1),
            _ => None,
        }
    }
    match_by(source, target, |s, t| role(s).is_some() && role(s) == role(t))
}

fn match_by<F>(source: &[CoordinateAxis], target: &[CoordinateAxis], matches: F) -> Option<Vec<usize>>
where
    F: Fn(&CoordinateAxis, &CoordinateAxis) -> bool,
{
    let mut used = vec![false; source.len()];
    let mut order = Vec::with_capacity(target.len());
    for t in target {
        let j = (0..source.len()).find(|&j| !used[j] && matches(&source[j], t))?;
        used[j] = true;
        order.push(j);
    }
    Some(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use georef_common::{AxisDirection, GeodeticDatum, Unit};
    use test_utils::utm_swath;

    fn geographic_builder(lons: [f64; 2], lats: [f64; 2], longitude_first: bool) -> LocalizationGridBuilder {
        let mut builder = LocalizationGridBuilder::new(3, 3).unwrap();
        let mut lon = Vec::new();
        let mut lat = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                lon.push(lons[0] + (lons[1] - lons[0]) * x as f64 / 2.0);
                lat.push(lats[0] + (lats[1] - lats[0]) * y as f64 / 2.0);
            }
        }
        let (a, b) = if longitude_first { (lon, lat) } else { (lat, lon) };
        builder.set_control_points(0, &a).unwrap();
        builder.set_control_points(1, &b).unwrap();
        builder
    }

    fn universal() -> BTreeSet<LinearizerKind> {
        BTreeSet::from([LinearizerKind::Universal])
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(LinearizerKind::parse_list("universal"), universal());
        assert_eq!(LinearizerKind::parse_list(" Universal , UTM"), universal());
        assert!(LinearizerKind::parse_list("none").is_empty());
        assert!(LinearizerKind::parse_list("").is_empty());
    }

    #[test]
    fn test_center_reference_point() {
        let mut builder = geographic_builder([10.0, 12.0], [40.0, 42.0], true);
        let linearizers = Linearizer::set_candidates_on_grid(&universal(), &mut builder, true);
        assert_eq!(linearizers.len(), 1);
        assert_eq!(builder.linearizer_count(), 1);
        let l = &linearizers[0];
        assert_eq!(l.reference_point(), (41.0, 11.0));
        assert_eq!(l.target_crs().identifier, Some(32632));
        assert!(l.axis_swap());
        assert_eq!(l.potential_cause(), None);
    }

    #[test]
    fn test_polar_edge_reference_point() {
        let mut builder = geographic_builder([-10.0, 10.0], [70.0, 86.0], false);
        let linearizers = Linearizer::set_candidates_on_grid(&universal(), &mut builder, false);
        let l = &linearizers[0];
        assert_eq!(l.reference_point(), (86.0, 0.0));
        assert_eq!(l.target_crs().identifier, Some(32661));
        assert!(!l.axis_swap());

        let mut builder = geographic_builder([-10.0, 10.0], [-75.0, -62.0], true);
        let linearizers = Linearizer::set_candidates_on_grid(&universal(), &mut builder, true);
        assert_eq!(linearizers[0].reference_point(), (-75.0, 0.0));
        assert_eq!(linearizers[0].target_crs().identifier, Some(32731));
    }

    #[test]
    fn test_wide_span_diagnostic() {
        let mut builder = geographic_builder([-90.0, 87.0], [-10.0, 10.0], true);
        let linearizers = Linearizer::set_candidates_on_grid(&universal(), &mut builder, true);
        assert_eq!(linearizers[0].longitude_span(), 177.0);
        let cause = linearizers[0].potential_cause().unwrap();
        assert!(cause.contains("177.0°"));
    }

    #[test]
    fn test_fitted_grid_is_projected() {
        let swath = utm_swath(31, true, (400_000.0, 5_000_000.0), (50_000.0, 50_000.0), 5, 5);
        let mut builder = LocalizationGridBuilder::new(5, 5).unwrap();
        builder.set_control_points(0, &swath.lon).unwrap();
        builder.set_control_points(1, &swath.lat).unwrap();
        let linearizers = Linearizer::set_candidates_on_grid(&universal(), &mut builder, true);
        assert_eq!(linearizers[0].target_crs().identifier, Some(32631));

        let grid = builder.create().unwrap();
        assert_eq!(grid.linearizer(), Some(0));
        // Easting first, as longitude was first.
        let (e, n) = grid.transform(0.0, 0.0);
        assert!((e - 400_000.0).abs() < 1e-3, "easting {}", e);
        assert!((n - 5_000_000.0).abs() < 1e-3, "northing {}", n);
    }

    #[test]
    fn test_replace_permutes_rows() {
        let mut components = vec![SingleCrs::geographic(GeodeticDatum::wgs84(), false)];
        let mut affine = transform::scale(&[2.0, 3.0]);
        let replacements = [Replacement {
            first_dimension: 0,
            target: SingleCrs::from_epsg(32631).unwrap(),
        }];
        replace_in_compound_crs(&mut components, &replacements, Some(&mut affine)).unwrap();
        assert_eq!(components[0].identifier, Some(32631));
        assert_eq!(affine[(0, 1)], 3.0);
        assert_eq!(affine[(1, 0)], 2.0);
    }

    #[test]
    fn test_replace_polar_axes_leniently() {
        let mut components = vec![SingleCrs::geographic(GeodeticDatum::wgs84(), true)];
        let mut affine = transform::identity(2);
        let replacements = [Replacement {
            first_dimension: 0,
            target: SingleCrs::from_epsg(32661).unwrap(),
        }];
        replace_in_compound_crs(&mut components, &replacements, Some(&mut affine)).unwrap();
        assert_eq!(components[0].axes[0].direction, AxisDirection::SouthAlong(90));
        assert!(transform::is_identity(&affine, 0.0));
    }

    #[test]
    fn test_cannot_inject_without_geographic_component() {
        let mut components = vec![SingleCrs {
            name: "Time".to_string(),
            identifier: None,
            kind: CrsKind::Temporal { epoch: None },
            axes: vec![CoordinateAxis::new("time", "t", AxisDirection::Future, Unit::Day)],
        }];
        let replacements = [Replacement {
            first_dimension: 0,
            target: SingleCrs::from_epsg(32631).unwrap(),
        }];
        let err = replace_in_compound_crs(&mut components, &replacements, None).unwrap_err();
        assert!(matches!(err, ReferencingError::CannotInjectComponent { .. }));
    }
}
