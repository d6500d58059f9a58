//! Coordinate operations needed to georeference curvilinear grids.
//!
//! Implements the universal projections (UTM and UPS) from scratch, a lookup of the
//! universal CRS for a geographic point, and a localization grid builder that fits
//! candidate projections to a table of control points and keeps the most linear one.

pub mod error;
pub mod localization;
pub mod polar_stereographic;
pub mod referencing;
pub mod transform;
pub mod transverse_mercator;

pub use error::{LocalizationGridError, Result};
pub use localization::{LocalizationGrid, LocalizationGridBuilder};
pub use polar_stereographic::PolarStereographic;
pub use referencing::{universal_crs, universal_projection, universal_transform};
pub use transform::{MathTransform2D, SwapAxes};
pub use transverse_mercator::TransverseMercator;
