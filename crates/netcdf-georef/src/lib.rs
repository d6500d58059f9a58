//! CRS and grid geometry inference for netCDF variables.
//!
//! Given the variables of a netCDF file (already read into memory), this crate infers for
//! each data variable its grid extent, the transform from grid indices to coordinates, and
//! the coordinate reference system of those coordinates.
//!
//! # Pipeline
//!
//! 1. Non-standard date encodings (`day as %Y%m%d.%f`, `CCYYMMDD`) are rewritten into
//!    CF `<unit> since <epoch>` units ([`DateEncodingNormalizer`]).
//! 2. Coordinate variables are classified into axes ([`AxisRoleResolver`], [`Axis`]).
//! 3. The grid of each variable is found, relating decimated dimensions to the full
//!    resolution axes when needed ([`Grid`], [`GridAdjustment`]).
//! 4. Two-dimensional longitude and latitude axes are fitted into localization grids,
//!    optionally through a linearizer projection ([`Linearizer`]). Fitted grids are
//!    shared between variables and files ([`GlobalGridCache`]).
//! 5. The CRS implied by the axes is merged with the one declared by a grid mapping
//!    variable ([`CrsMerger`], [`GridMapping`]).
//!
//! Non-fatal problems are reported to [`Listeners`] and logged with `tracing`.
//!
//! # Example
//!
//! ```ignore
//! let cache = Arc::new(GlobalGridCache::default());
//! let mut decoder = Decoder::new("sst.nc", variables, DecoderConfig::from_env(), cache, Listeners::new())?;
//! for (name, geometry) in decoder.grid_geometries() {
//!     println!("{}: {:?} {:?}", name, geometry.extent(), geometry.crs());
//! }
//! ```

pub mod axis;
pub mod axis_type;
pub mod config;
pub mod convention;
pub mod crs_builder;
pub mod crs_merger;
pub mod date_encoding;
pub mod decoder;
pub mod error;
pub mod grid;
pub mod grid_adjustment;
pub mod grid_cache;
pub mod grid_geometry;
pub mod grid_mapping;
pub mod linearizer;
pub mod listeners;
pub mod variable;

pub use axis::Axis;
pub use axis_type::{AxisAbbreviation, AxisRole, AxisRoleResolver};
pub use config::DecoderConfig;
pub use convention::{CfConvention, Convention};
pub use crs_builder::CrsBuilder;
pub use crs_merger::CrsMerger;
pub use date_encoding::{DateEncodingNormalizer, DatePattern, PatternScope};
pub use decoder::Decoder;
pub use error::{DecoderError, Result};
pub use grid::{Grid, GridContext};
pub use grid_adjustment::GridAdjustment;
pub use grid_cache::{GlobalGridCache, GlobalKey, GridCacheStats, GridCacheValue, LocalGridCache, LocalKey};
pub use grid_geometry::{GridGeometry, GridToCrs, PixelInCell, TransformStep};
pub use grid_mapping::GridMapping;
pub use linearizer::{replace_in_compound_crs, Linearizer, LinearizerKind};
pub use listeners::{CollectingListener, DecoderEvent, EventLevel, Listeners, WarningListener};
pub use variable::{AttributeValue, Dimension, Variable, VariableData};
