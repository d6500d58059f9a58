//! Common types shared across the georeferencing crates.
//!
//! The model is deliberately small: only what is needed to describe the coordinate
//! reference systems inferred from netCDF coordinate variables (geographic, projected,
//! vertical, temporal and engineering components) and to compare them.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod time;
pub mod units;

pub use bbox::BoundingBox;
pub use crs::{
    AxesConvention, AxisDirection, AxisRange, CoordinateAxis, Crs, CrsKind, GeodeticDatum,
    Projection, SingleCrs,
};
pub use error::{ReferencingError, ReferencingResult};
pub use time::TimeUnits;
pub use units::Unit;
