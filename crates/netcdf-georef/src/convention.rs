//! Hooks for conventions that extend or deviate from CF.
//!
//! The decoder asks its [`Convention`] for every piece of information that some
//! producers encode in non-standard attributes. [`CfConvention`] implements the CF
//! behavior plus the common `dim{i}` / `resampling_interval` extension used by
//! decimated localization grids.

use crate::config::DecoderConfig;
use crate::date_encoding::DateEncodingNormalizer;
use crate::linearizer::LinearizerKind;
use crate::listeners::Listeners;
use crate::variable::Variable;
use georef_common::GeodeticDatum;
use std::collections::BTreeSet;
use std::fmt;

/// Convention-specific interpretation of variables and attributes.
pub trait Convention: fmt::Debug + Send + Sync {
    /// Label of the dimension at `index` (netCDF order), used to relate the dimensions of
    /// a data variable to the dimensions of a smaller localization grid.
    fn name_of_dimension(&self, variable: &Variable, index: usize) -> Option<String> {
        variable.attribute_as_string(&format!("dim{}", index))
    }

    /// Factor by which to multiply a grid index to get the corresponding data index.
    fn grid_to_data_indices(&self, axis: &Variable, listeners: &Listeners) -> Option<f64> {
        axis.attribute_as_number("resampling_interval", listeners)
    }

    /// Names of the axis variables expected for the given data variable, if known.
    fn names_of_axis_variables(&self, _data: &Variable) -> Option<Vec<String>> {
        None
    }

    /// Name of the variable holding the grid mapping attributes of a data variable.
    fn name_of_mapping_node(&self, data: &Variable) -> Option<String> {
        data.attribute_as_string("grid_mapping")
    }

    /// Linearizers to try on localization grids.
    fn linearizers(&self) -> BTreeSet<LinearizerKind>;

    /// Normalizer of the non-standard date encodings recognized by this convention.
    fn date_patterns(&self) -> DateEncodingNormalizer;

    /// Datum used when a file does not specify one.
    fn default_datum(&self) -> GeodeticDatum {
        GeodeticDatum::wgs84()
    }
}

/// The CF convention, configured by a [`DecoderConfig`].
#[derive(Debug, Clone)]
pub struct CfConvention {
    linearizers: BTreeSet<LinearizerKind>,
    dates: DateEncodingNormalizer,
}

impl CfConvention {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            linearizers: config.linearizers.clone(),
            dates: DateEncodingNormalizer::new(config),
        }
    }
}

impl Default for CfConvention {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl Convention for CfConvention {
    fn linearizers(&self) -> BTreeSet<LinearizerKind> {
        self.linearizers.clone()
    }

    fn date_patterns(&self) -> DateEncodingNormalizer {
        self.dates.clone()
    }
}
