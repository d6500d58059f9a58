//! Error types for localization grid fitting.

use thiserror::Error;

/// Result type alias using LocalizationGridError.
pub type Result<T> = std::result::Result<T, LocalizationGridError>;

/// Errors raised while building or fitting a localization grid.
#[derive(Debug, Error)]
pub enum LocalizationGridError {
    /// The grid needs at least 2×2 control points.
    #[error("Invalid localization grid size {width}×{height}")]
    InvalidSize { width: usize, height: usize },

    /// A vector of control points does not have one value per grid cell.
    #[error("Expected {expected} control point coordinates but got {actual}")]
    MismatchedLength { expected: usize, actual: usize },

    /// A control point coordinate is NaN or infinite.
    #[error("Non-finite coordinate in dimension {dimension} at grid index ({x}, {y})")]
    NonFiniteValue { dimension: usize, x: usize, y: usize },

    /// The fitted grid folds over itself, so it cannot be inverted.
    #[error("Localization grid is not invertible: {0}")]
    NotInvertible(String),

    /// Another error with a diagnostic of what probably caused it.
    #[error("{source} Potential cause: {cause}")]
    WithPotentialCause {
        #[source]
        source: Box<LocalizationGridError>,
        cause: String,
    },
}

impl LocalizationGridError {
    /// Attach a best-effort diagnostic of the probable cause of this error.
    pub fn with_potential_cause(self, cause: impl Into<String>) -> Self {
        Self::WithPotentialCause {
            source: Box::new(self),
            cause: cause.into(),
        }
    }

    /// The diagnostic attached by [`Self::with_potential_cause`], if any.
    pub fn potential_cause(&self) -> Option<&str> {
        match self {
            Self::WithPotentialCause { cause, .. } => Some(cause),
            _ => None,
        }
    }
}
