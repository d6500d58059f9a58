//! Localization grids: grid-to-CRS transforms defined by a table of control points.
//!
//! A [`LocalizationGridBuilder`] receives the coordinates of every grid cell (for example
//! the longitude and latitude arrays of a satellite swath), optionally a set of candidate
//! projections ("linearizers"), and creates a [`LocalizationGrid`]. When candidates are
//! registered, the builder projects the control points with each of them, fits an affine
//! transform by least squares and keeps the candidate whose result is the most linear.

use crate::error::{LocalizationGridError, Result};
use crate::transform::MathTransform2D;
use nalgebra::{Matrix3, Vector3};
use std::sync::Arc;
use tracing::debug;

/// Default precision of inverse transforms, in units of grid cells.
pub const DEFAULT_PRECISION: f64 = 0.001;

/// A candidate projection applied to the control points before fitting.
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    transform: Arc<dyn MathTransform2D>,
}

/// Result of fitting an affine transform to projected control points.
#[derive(Debug, Clone)]
struct Fit {
    /// Index of the candidate in registration order, or `None` for the identity.
    candidate: Option<usize>,
    coordinates: [Vec<f64>; 2],
    affine: Matrix3<f64>,
    /// Smallest coefficient of determination over the two output dimensions.
    correlation: f64,
}

/// Builder of [`LocalizationGrid`]s.
#[derive(Debug, Clone)]
pub struct LocalizationGridBuilder {
    width: usize,
    height: usize,
    /// Control point coordinates per target dimension, row-major with x varying fastest.
    coordinates: [Vec<f64>; 2],
    candidates: Vec<Candidate>,
    desired_precision: f64,
}

impl LocalizationGridBuilder {
    /// Create a builder for a grid of `width` × `height` control points.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width < 2 || height < 2 {
            return Err(LocalizationGridError::InvalidSize { width, height });
        }
        let len = width * height;
        Ok(Self {
            width,
            height,
            coordinates: [vec![f64::NAN; len], vec![f64::NAN; len]],
            candidates: Vec::new(),
            desired_precision: DEFAULT_PRECISION,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Set the coordinates of all control points in one target dimension (0 or 1).
    ///
    /// Values are in row-major order with the x grid index varying fastest.
    pub fn set_control_points(&mut self, dimension: usize, values: &[f64]) -> Result<()> {
        let expected = self.width * self.height;
        if values.len() != expected || dimension > 1 {
            return Err(LocalizationGridError::MismatchedLength {
                expected,
                actual: values.len(),
            });
        }
        self.coordinates[dimension].copy_from_slice(values);
        Ok(())
    }

    /// Coordinates of the control point at the given grid indices.
    pub fn control_point(&self, x: usize, y: usize) -> (f64, f64) {
        let i = y * self.width + x;
        (self.coordinates[0][i], self.coordinates[1][i])
    }

    /// Set the precision (in grid cells) desired for inverse transforms.
    pub fn set_desired_precision(&mut self, precision: f64) {
        if precision > 0.0 && precision.is_finite() {
            self.desired_precision = precision;
        }
    }

    /// Register a candidate projection. Candidates consume control points in the
    /// order of the target dimensions.
    pub fn add_linearizer(&mut self, name: impl Into<String>, transform: Arc<dyn MathTransform2D>) {
        self.candidates.push(Candidate {
            name: name.into(),
            transform,
        });
    }

    /// Number of registered candidates.
    pub fn linearizer_count(&self) -> usize {
        self.candidates.len()
    }

    /// Remove discontinuities in a cyclic dimension such as longitude.
    ///
    /// Values are shifted by multiples of `period` so that consecutive control points along
    /// each row, and the first points of consecutive rows, never differ by more than half a
    /// period. Returns whether any value changed.
    pub fn resolve_wraparound_axis(&mut self, dimension: usize, period: f64) -> bool {
        let width = self.width;
        let values = &mut self.coordinates[dimension];
        let half = period / 2.0;
        let mut changed = false;

        let mut shift = |values: &mut [f64], i: usize, previous: usize| {
            let delta = values[i] - values[previous];
            if delta.abs() > half {
                values[i] -= period * (delta / period).round();
                changed = true;
            }
        };
        for y in 0..self.height {
            let row = y * width;
            if y > 0 {
                shift(values, row, row - width);
            }
            for x in 1..width {
                shift(values, row + x, row + x - 1);
            }
        }
        changed
    }

    /// Minimum and maximum values in a target dimension, ignoring NaN.
    pub fn coordinate_range(&self, dimension: usize) -> (f64, f64) {
        self.coordinates[dimension]
            .iter()
            .filter(|v| !v.is_nan())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Fit the grid and keep the most linear candidate.
    ///
    /// The identity (no projection) is always evaluated first and wins ties.
    pub fn create(&self) -> Result<LocalizationGrid> {
        for (dimension, values) in self.coordinates.iter().enumerate() {
            if let Some(i) = values.iter().position(|v| !v.is_finite()) {
                return Err(LocalizationGridError::NonFiniteValue {
                    dimension,
                    x: i % self.width,
                    y: i / self.width,
                });
            }
        }

        let mut best = self.fit(None, self.coordinates.clone());
        for (index, candidate) in self.candidates.iter().enumerate() {
            let mut projected = [Vec::with_capacity(self.len()), Vec::with_capacity(self.len())];
            for (a, b) in self.coordinates[0].iter().zip(&self.coordinates[1]) {
                let (x, y) = candidate.transform.transform(*a, *b);
                projected[0].push(x);
                projected[1].push(y);
            }
            if projected.iter().flatten().any(|v| !v.is_finite()) {
                debug!(candidate = %candidate.name, "Candidate projection outside its domain");
                continue;
            }
            let fit = self.fit(Some(index), projected);
            debug!(
                candidate = %candidate.name,
                correlation = fit.correlation,
                "Evaluated linearizer candidate"
            );
            if fit.correlation > best.correlation {
                best = fit;
            }
        }

        self.check_folds(&best)?;
        Ok(LocalizationGrid {
            width: self.width,
            height: self.height,
            linearizer: best
                .candidate
                .map(|i| (i, self.candidates[i].name.clone())),
            coordinates: best.coordinates,
            affine: best.affine,
            correlation: best.correlation,
            precision: self.desired_precision,
        })
    }

    fn len(&self) -> usize {
        self.width * self.height
    }

    /// Least-squares fit of `v = a·x + b·y + c` for each target dimension.
    fn fit(&self, candidate: Option<usize>, coordinates: [Vec<f64>; 2]) -> Fit {
        let mut normal = Matrix3::<f64>::zeros();
        for y in 0..self.height {
            for x in 0..self.width {
                let p = Vector3::new(x as f64, y as f64, 1.0);
                normal += p * p.transpose();
            }
        }
        // Invertible for any grid of at least 2×2 points.
        let inverse = normal.try_inverse().unwrap_or_else(Matrix3::zeros);

        let mut affine = Matrix3::identity();
        let mut correlation = 1.0_f64;
        for (dim, values) in coordinates.iter().enumerate() {
            let mut rhs = Vector3::zeros();
            for (i, v) in values.iter().enumerate() {
                let p = Vector3::new((i % self.width) as f64, (i / self.width) as f64, 1.0);
                rhs += p * *v;
            }
            let coeffs = inverse * rhs;
            affine.set_row(dim, &coeffs.transpose());

            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let mut ss_tot = 0.0;
            let mut ss_res = 0.0;
            for (i, v) in values.iter().enumerate() {
                let fitted = coeffs[0] * (i % self.width) as f64
                    + coeffs[1] * (i / self.width) as f64
                    + coeffs[2];
                ss_tot += (v - mean).powi(2);
                ss_res += (v - fitted).powi(2);
            }
            let r2 = if ss_tot > 0.0 {
                1.0 - ss_res / ss_tot
            } else {
                1.0
            };
            correlation = correlation.min(r2);
        }
        Fit {
            candidate,
            coordinates,
            affine,
            correlation,
        }
    }

    /// Verify that every cell has the same orientation as the affine approximation.
    fn check_folds(&self, fit: &Fit) -> Result<()> {
        let det = fit.affine[(0, 0)] * fit.affine[(1, 1)] - fit.affine[(0, 1)] * fit.affine[(1, 0)];
        if det == 0.0 || !det.is_finite() {
            return Err(LocalizationGridError::NotInvertible(
                "control points are colinear".to_string(),
            ));
        }
        let [xs, ys] = &fit.coordinates;
        let w = self.width;
        let cross = |o: usize, a: usize, b: usize| {
            (xs[a] - xs[o]) * (ys[b] - ys[o]) - (ys[a] - ys[o]) * (xs[b] - xs[o])
        };
        for y in 0..self.height - 1 {
            for x in 0..w - 1 {
                let p00 = y * w + x;
                let p10 = p00 + 1;
                let p01 = p00 + w;
                let p11 = p01 + 1;
                let c0 = cross(p00, p10, p01);
                let c1 = cross(p11, p01, p10);
                if c0 * det <= 0.0 || c1 * det <= 0.0 {
                    return Err(LocalizationGridError::NotInvertible(format!(
                        "grid folds at cell ({}, {})",
                        x, y
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A fitted localization grid.
///
/// Maps fractional grid indices to coordinates in the target space of the selected
/// linearizer (or in the space of the control points if no candidate was better than
/// the identity) by bilinear interpolation between control points.
#[derive(Debug, Clone)]
pub struct LocalizationGrid {
    width: usize,
    height: usize,
    linearizer: Option<(usize, String)>,
    coordinates: [Vec<f64>; 2],
    affine: Matrix3<f64>,
    correlation: f64,
    precision: f64,
}

impl LocalizationGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Index (in registration order) of the candidate selected by the fit, if any.
    pub fn linearizer(&self) -> Option<usize> {
        self.linearizer.as_ref().map(|(i, _)| *i)
    }

    /// Name of the candidate selected by the fit, if any.
    pub fn linearizer_name(&self) -> Option<&str> {
        self.linearizer.as_ref().map(|(_, n)| n.as_str())
    }

    /// Affine approximation of this grid, from grid indices to target coordinates.
    pub fn affine(&self) -> &Matrix3<f64> {
        &self.affine
    }

    /// Smallest coefficient of determination of the affine approximation.
    pub fn correlation(&self) -> f64 {
        self.correlation
    }

    /// Target coordinates of all control points in one dimension.
    pub fn coordinates(&self, dimension: usize) -> &[f64] {
        &self.coordinates[dimension]
    }

    /// Transform fractional grid indices to target coordinates.
    ///
    /// Points outside the grid are extrapolated from the nearest cell.
    pub fn transform(&self, gx: f64, gy: f64) -> (f64, f64) {
        let cx = (gx.floor().max(0.0) as usize).min(self.width - 2);
        let cy = (gy.floor().max(0.0) as usize).min(self.height - 2);
        let fx = gx - cx as f64;
        let fy = gy - cy as f64;
        let i00 = cy * self.width + cx;
        let i10 = i00 + 1;
        let i01 = i00 + self.width;
        let i11 = i01 + 1;
        let interpolate = |v: &[f64]| {
            v[i00] * (1.0 - fx) * (1.0 - fy)
                + v[i10] * fx * (1.0 - fy)
                + v[i01] * (1.0 - fx) * fy
                + v[i11] * fx * fy
        };
        (
            interpolate(&self.coordinates[0]),
            interpolate(&self.coordinates[1]),
        )
    }

    /// Inverse transform, iterating until the error is below the desired precision.
    ///
    /// Returns `None` if the iteration does not converge.
    pub fn inverse_transform(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let inverse = self.affine.try_inverse()?;
        let start = inverse * Vector3::new(x, y, 1.0);
        let (mut gx, mut gy) = (start[0], start[1]);
        for _ in 0..50 {
            let (tx, ty) = self.transform(gx, gy);
            let delta = inverse.fixed_view::<2, 2>(0, 0) * nalgebra::Vector2::new(x - tx, y - ty);
            gx += delta[0];
            gy += delta[1];
            if delta[0].abs() < self.precision && delta[1].abs() < self.precision {
                return Some((gx, gy));
            }
        }
        None
    }
}
