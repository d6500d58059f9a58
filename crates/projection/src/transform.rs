//! Two-dimensional transforms and affine matrix helpers.

use nalgebra::DMatrix;
use std::fmt;
use std::sync::Arc;

/// A non-linear transform between two-dimensional coordinate systems.
///
/// Input and output coordinates follow the axis order of the source and target CRS.
/// Points outside the domain of validity map to NaN.
pub trait MathTransform2D: fmt::Debug + Send + Sync {
    /// Transform a single point.
    fn transform(&self, a: f64, b: f64) -> (f64, f64);

    /// Human-readable name of the operation, used in diagnostics.
    fn name(&self) -> String;
}

/// Swap the input coordinates before and optionally the output coordinates after
/// delegating to another transform.
#[derive(Debug, Clone)]
pub struct SwapAxes {
    pub inner: Arc<dyn MathTransform2D>,
    pub swap_input: bool,
    pub swap_output: bool,
}

impl MathTransform2D for SwapAxes {
    fn transform(&self, a: f64, b: f64) -> (f64, f64) {
        let (a, b) = if self.swap_input { (b, a) } else { (a, b) };
        let (x, y) = self.inner.transform(a, b);
        if self.swap_output {
            (y, x)
        } else {
            (x, y)
        }
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}

/// Identity affine matrix for `dim` dimensions, of size (dim+1)×(dim+1).
pub fn identity(dim: usize) -> DMatrix<f64> {
    DMatrix::identity(dim + 1, dim + 1)
}

/// Affine matrix scaling each dimension by the given factor.
pub fn scale(factors: &[f64]) -> DMatrix<f64> {
    let mut m = identity(factors.len());
    for (i, f) in factors.iter().enumerate() {
        m[(i, i)] = *f;
    }
    m
}

/// Affine matrix translating each dimension by the given offset.
pub fn translation(offsets: &[f64]) -> DMatrix<f64> {
    let dim = offsets.len();
    let mut m = identity(dim);
    for (i, t) in offsets.iter().enumerate() {
        m[(i, dim)] = *t;
    }
    m
}

/// Apply an affine matrix to a point. The point must have one less coordinate
/// than the matrix has columns.
pub fn apply(matrix: &DMatrix<f64>, point: &[f64]) -> Vec<f64> {
    let src = matrix.ncols() - 1;
    let tgt = matrix.nrows() - 1;
    (0..tgt)
        .map(|r| {
            let mut sum = matrix[(r, src)];
            for (c, v) in point.iter().take(src).enumerate() {
                sum += matrix[(r, c)] * v;
            }
            sum
        })
        .collect()
}

/// Permute a block of rows: after the call, row `first + k` holds the old row
/// `first + order[k]`.
pub fn permute_rows(matrix: &mut DMatrix<f64>, first: usize, order: &[usize]) {
    let old = matrix.clone();
    for (k, &o) in order.iter().enumerate() {
        matrix.set_row(first + k, &old.row(first + o));
    }
}

/// Whether the matrix is the identity, within the given tolerance.
pub fn is_identity(matrix: &DMatrix<f64>, tolerance: f64) -> bool {
    matrix.is_square()
        && matrix
            .iter()
            .zip(DMatrix::<f64>::identity(matrix.nrows(), matrix.ncols()).iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Offset;

    impl MathTransform2D for Offset {
        fn transform(&self, a: f64, b: f64) -> (f64, f64) {
            (a + 1.0, b * 2.0)
        }

        fn name(&self) -> String {
            "offset".to_string()
        }
    }

    #[test]
    fn test_swap_axes() {
        let swap = SwapAxes {
            inner: Arc::new(Offset),
            swap_input: true,
            swap_output: false,
        };
        assert_eq!(swap.transform(3.0, 5.0), (6.0, 6.0));
        let both = SwapAxes {
            swap_output: true,
            ..swap
        };
        assert_eq!(both.transform(3.0, 5.0), (6.0, 6.0));
        assert_eq!(both.transform(1.0, 0.0), (2.0, 1.0));
    }

    #[test]
    fn test_scale_then_translate() {
        let m = translation(&[10.0, 20.0]) * scale(&[2.0, 3.0]);
        assert_eq!(apply(&m, &[1.0, 1.0]), vec![12.0, 23.0]);
        assert!(is_identity(&identity(3), 0.0));
        assert!(!is_identity(&m, 1e-9));
    }

    #[test]
    fn test_permute_rows() {
        let mut m = scale(&[2.0, 3.0, 4.0]);
        permute_rows(&mut m, 1, &[1, 0]);
        assert_eq!(apply(&m, &[1.0, 1.0, 1.0]), vec![2.0, 4.0, 3.0]);
    }
}
