//! Error types for grid geometry and CRS inference.

use georef_common::ReferencingError;
use projection::LocalizationGridError;
use thiserror::Error;

/// Result type alias using DecoderError.
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors raised while resolving the grid geometry of one variable.
///
/// None of these errors is fatal to a whole file: the decoder reports them as warnings
/// for the variable concerned and continues with the other variables.
#[derive(Debug, Error)]
pub enum DecoderError {
    /// The same dimension label maps to two different grid dimensions.
    #[error("Dimension label '{label}' is used by both '{first}' and '{second}' in variable '{variable}'")]
    DuplicatedIdentifier {
        variable: String,
        label: String,
        first: String,
        second: String,
    },

    /// The dimensions of a variable cannot be related to the dimensions of its grid.
    #[error("Cannot relate the dimensions of variable '{variable}' to its grid: {message}")]
    MismatchedGrid { variable: String, message: String },

    /// No variable of the given name exists in the file.
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// Fitting a localization grid failed.
    #[error("Localization grid error: {0}")]
    LocalizationGrid(#[from] LocalizationGridError),

    /// Building or recombining a CRS failed.
    #[error("Referencing error: {0}")]
    Referencing(#[from] ReferencingError),

    /// The decoder configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal state.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DecoderError {
    /// Create a DuplicatedIdentifier error.
    pub fn duplicated_identifier(
        variable: impl Into<String>,
        label: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::DuplicatedIdentifier {
            variable: variable.into(),
            label: label.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a MismatchedGrid error.
    pub fn mismatched_grid(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MismatchedGrid {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
