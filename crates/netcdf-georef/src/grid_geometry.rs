//! Grid geometries: grid extent, grid-to-CRS transform and CRS of a variable.

use georef_common::Crs;
use nalgebra::DMatrix;
use projection::{transform, LocalizationGrid};
use std::sync::Arc;

/// Which point of a cell the integer grid indices refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelInCell {
    CellCenter,
    CellCorner,
}

/// A non-linear step of a grid-to-CRS transform, applied to grid indices in natural order.
#[derive(Debug, Clone)]
pub enum TransformStep {
    /// Replace the index in one dimension by the coordinate interpolated from irregular
    /// axis values.
    Interpolation { dimension: usize, values: Vec<f64> },
    /// Replace the indices in two dimensions by the output of a localization grid. The
    /// first dimension is the grid x (fastest varying) index.
    Localization {
        dimensions: [usize; 2],
        grid: Arc<LocalizationGrid>,
    },
}

impl TransformStep {
    fn apply(&self, point: &mut [f64]) {
        match self {
            TransformStep::Interpolation { dimension, values } => {
                point[*dimension] = interpolate(values, point[*dimension]);
            }
            TransformStep::Localization {
                dimensions: [x, y],
                grid,
            } => {
                let (a, b) = grid.transform(point[*x], point[*y]);
                point[*x] = a;
                point[*y] = b;
            }
        }
    }
}

/// Linear interpolation between values at integer indices, extrapolated from the ends.
fn interpolate(values: &[f64], index: f64) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => values[0],
        n => {
            let i = (index.floor().max(0.0) as usize).min(n - 2);
            let f = index - i as f64;
            values[i] + (values[i + 1] - values[i]) * f
        }
    }
}

/// Transform from grid indices (natural order) to CRS coordinates.
///
/// Applies, in order, an optional scale from data indices to grid indices, the non-linear
/// steps, then an affine matrix whose output follows the CRS axis order.
#[derive(Debug, Clone)]
pub struct GridToCrs {
    scale: Option<Vec<f64>>,
    steps: Vec<TransformStep>,
    affine: DMatrix<f64>,
}

impl GridToCrs {
    pub fn new(steps: Vec<TransformStep>, affine: DMatrix<f64>) -> Self {
        Self {
            scale: None,
            steps,
            affine,
        }
    }

    pub fn scale(&self) -> Option<&[f64]> {
        self.scale.as_deref()
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    pub fn affine(&self) -> &DMatrix<f64> {
        &self.affine
    }

    pub fn affine_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.affine
    }

    /// Number of source dimensions.
    pub fn dimension(&self) -> usize {
        self.affine.ncols() - 1
    }

    /// Whether a localization grid of this transform was fitted through a linearizer.
    pub fn is_linearized(&self) -> bool {
        self.steps.iter().any(|s| {
            matches!(s, TransformStep::Localization { grid, .. } if grid.linearizer().is_some())
        })
    }

    /// Whether the transform is a pure affine matrix.
    pub fn is_affine(&self) -> bool {
        self.steps.is_empty()
    }

    /// Transform grid indices to CRS coordinates.
    pub fn transform(&self, indices: &[f64]) -> Vec<f64> {
        let mut point = indices.to_vec();
        if let Some(scale) = &self.scale {
            point.iter_mut().zip(scale).for_each(|(p, s)| *p *= s);
        }
        for step in &self.steps {
            step.apply(&mut point);
        }
        transform::apply(&self.affine, &point)
    }

    /// Compose a scale of the source indices before this transform.
    fn pre_scaled(&self, factors: &[f64]) -> Self {
        let scale = match &self.scale {
            Some(existing) => existing.iter().zip(factors).map(|(a, b)| a * b).collect(),
            None => factors.to_vec(),
        };
        Self {
            scale: Some(scale),
            steps: self.steps.clone(),
            affine: self.affine.clone(),
        }
    }
}

/// The geometry of a gridded variable.
#[derive(Debug, Clone)]
pub struct GridGeometry {
    /// Number of cells per dimension, in natural order (fastest varying first).
    extent: Vec<usize>,
    anchor: PixelInCell,
    grid_to_crs: Option<GridToCrs>,
    crs: Option<Arc<Crs>>,
}

impl GridGeometry {
    pub fn new(
        extent: Vec<usize>,
        anchor: PixelInCell,
        grid_to_crs: Option<GridToCrs>,
        crs: Option<Arc<Crs>>,
    ) -> Self {
        Self {
            extent,
            anchor,
            grid_to_crs,
            crs,
        }
    }

    pub fn extent(&self) -> &[usize] {
        &self.extent
    }

    pub fn anchor(&self) -> PixelInCell {
        self.anchor
    }

    pub fn grid_to_crs(&self) -> Option<&GridToCrs> {
        self.grid_to_crs.as_ref()
    }

    pub fn crs(&self) -> Option<&Arc<Crs>> {
        self.crs.as_ref()
    }

    pub fn dimension(&self) -> usize {
        self.extent.len()
    }

    /// Whether the grid-to-CRS transform goes through a linearizer projection.
    pub fn is_linearized(&self) -> bool {
        self.grid_to_crs.as_ref().is_some_and(GridToCrs::is_linearized)
    }

    /// A geometry for a variable of the given extent whose indices are converted to the
    /// indices of this grid by the given factors.
    pub fn scaled(&self, extent: Vec<usize>, factors: &[f64]) -> Self {
        Self {
            extent,
            anchor: self.anchor,
            grid_to_crs: self.grid_to_crs.as_ref().map(|t| t.pre_scaled(factors)),
            crs: self.crs.clone(),
        }
    }

    /// The same geometry with another CRS.
    pub fn with_crs(&self, crs: Arc<Crs>) -> Self {
        Self {
            crs: Some(crs),
            ..self.clone()
        }
    }

    /// CRS coordinates of the given grid indices, at the anchor of this geometry.
    pub fn transform(&self, indices: &[f64]) -> Option<Vec<f64>> {
        self.grid_to_crs.as_ref().map(|t| t.transform(indices))
    }

    /// CRS coordinates of the given grid indices, at the requested point of the cell.
    ///
    /// With a cell-center geometry, the corner of cell `i` is at index `i - 0.5`.
    pub fn transform_at(&self, indices: &[f64], anchor: PixelInCell) -> Option<Vec<f64>> {
        let shift = match (self.anchor, anchor) {
            (PixelInCell::CellCenter, PixelInCell::CellCorner) => -0.5,
            (PixelInCell::CellCorner, PixelInCell::CellCenter) => 0.5,
            _ => 0.0,
        };
        let shifted: Vec<f64> = indices.iter().map(|i| i + shift).collect();
        self.transform(&shifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    fn regular() -> GridGeometry {
        // lon = -180 + 0.5 i, lat = 90 - 0.5 j
        let mut affine = transform::identity(2);
        affine[(0, 0)] = 0.5;
        affine[(0, 2)] = -180.0;
        affine[(1, 1)] = -0.5;
        affine[(1, 2)] = 90.0;
        GridGeometry::new(
            vec![720, 361],
            PixelInCell::CellCenter,
            Some(GridToCrs::new(Vec::new(), affine)),
            None,
        )
    }

    #[test]
    fn test_affine_transform() {
        let geometry = regular();
        let p = geometry.transform(&[2.0, 4.0]).unwrap();
        assert_approx_eq!(p[0], -179.0, 1e-9);
        assert_approx_eq!(p[1], 88.0, 1e-9);
        assert!(!geometry.is_linearized());
        assert!(geometry.grid_to_crs().unwrap().is_affine());
    }

    #[test]
    fn test_cell_corner() {
        let corner = regular().transform_at(&[0.0, 0.0], PixelInCell::CellCorner).unwrap();
        assert_approx_eq!(corner[0], -180.25, 1e-9);
        assert_approx_eq!(corner[1], 90.25, 1e-9);
    }

    #[test]
    fn test_scaled() {
        let scaled = regular().scaled(vec![7200, 3610], &[0.1, 0.1]);
        assert_eq!(scaled.extent(), &[7200, 3610]);
        let p = scaled.transform(&[20.0, 40.0]).unwrap();
        assert_approx_eq!(p[0], -179.0, 1e-9);
        assert_approx_eq!(p[1], 88.0, 1e-9);

        let twice = scaled.scaled(vec![14400, 7220], &[0.5, 0.5]);
        let scale = twice.grid_to_crs().unwrap().scale().unwrap();
        assert_approx_eq!(scale[0], 0.05, 1e-12);
        assert_approx_eq!(scale[1], 0.05, 1e-12);
    }

    #[test]
    fn test_interpolation_step() {
        let steps = vec![TransformStep::Interpolation {
            dimension: 0,
            values: vec![0.0, 10.0, 30.0],
        }];
        let geometry = GridGeometry::new(
            vec![3],
            PixelInCell::CellCenter,
            Some(GridToCrs::new(steps, transform::identity(1))),
            None,
        );
        assert_approx_eq!(geometry.transform(&[1.5]).unwrap()[0], 20.0, 1e-9);
        assert_approx_eq!(geometry.transform(&[3.0]).unwrap()[0], 50.0, 1e-9);
        assert_approx_eq!(geometry.transform(&[-1.0]).unwrap()[0], -10.0, 1e-9);
    }
}
