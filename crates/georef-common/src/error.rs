//! Error types for CRS construction and manipulation.

use thiserror::Error;

/// Result type alias using ReferencingError.
pub type ReferencingResult<T> = Result<T, ReferencingError>;

/// Errors raised while building, comparing or recombining coordinate reference systems.
#[derive(Debug, Error)]
pub enum ReferencingError {
    /// A CRS component could not be substituted into a compound CRS.
    #[error("Cannot inject component '{component}' in '{target}'")]
    CannotInjectComponent { component: String, target: String },

    /// Two objects were expected to have the same number of dimensions.
    #[error("Mismatched dimension: expected {expected} but got {actual}")]
    MismatchedDimension { expected: usize, actual: usize },

    /// An authority code is not known by this crate.
    #[error("Unsupported authority code: {0}")]
    UnsupportedCode(String),

    /// A projection parameter is outside its domain of validity.
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },
}

impl ReferencingError {
    /// Create a CannotInjectComponent error.
    pub fn cannot_inject(component: impl Into<String>, target: impl Into<String>) -> Self {
        Self::CannotInjectComponent {
            component: component.into(),
            target: target.into(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}
