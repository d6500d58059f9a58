//! Decoder session: grid geometries of the variables of one file.

use crate::axis::Axis;
use crate::axis_type::{AxisAbbreviation, AxisRoleResolver};
use crate::config::DecoderConfig;
use crate::convention::{CfConvention, Convention};
use crate::crs_merger::CrsMerger;
use crate::error::{DecoderError, Result};
use crate::grid::{Grid, GridContext};
use crate::grid_adjustment::GridAdjustment;
use crate::grid_cache::{GlobalGridCache, LocalGridCache};
use crate::grid_geometry::{GridGeometry, PixelInCell};
use crate::grid_mapping::GridMapping;
use crate::listeners::{DecoderEvent, Listeners};
use crate::variable::{Dimension, Variable};
use georef_common::{Crs, TimeUnits};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Identifies a grid by its dimensions and axis names.
type GridSignature = (Vec<Dimension>, Vec<String>);

/// Resolves the grid geometries of the variables of one file.
///
/// Variables are normalized once at construction and immutable afterwards. A decoder is
/// used by one thread at a time; only the global grid cache is shared.
pub struct Decoder {
    filename: String,
    variables: Vec<Arc<Variable>>,
    axes: Vec<Arc<Axis>>,
    convention: Box<dyn Convention>,
    config: DecoderConfig,
    listeners: Listeners,
    local_cache: LocalGridCache,
    global_cache: Arc<GlobalGridCache>,
    geometries: HashMap<GridSignature, GridGeometry>,
}

impl Decoder {
    /// Create a decoder using the CF convention.
    pub fn new(
        filename: impl Into<String>,
        variables: Vec<Variable>,
        config: DecoderConfig,
        global_cache: Arc<GlobalGridCache>,
        listeners: Listeners,
    ) -> Result<Self> {
        let convention = Box::new(CfConvention::new(&config));
        Self::with_convention(filename, variables, config, global_cache, listeners, convention)
    }

    /// Create a decoder using the given convention.
    pub fn with_convention(
        filename: impl Into<String>,
        mut variables: Vec<Variable>,
        config: DecoderConfig,
        global_cache: Arc<GlobalGridCache>,
        listeners: Listeners,
        convention: Box<dyn Convention>,
    ) -> Result<Self> {
        config.validate().map_err(DecoderError::InvalidConfig)?;
        let filename = filename.into();

        // Epochs of time coordinate variables, borrowed by encoded dates on the same dimension.
        let time_units: HashMap<Dimension, TimeUnits> = variables
            .iter()
            .filter(|v| v.is_coordinate_variable())
            .filter_map(|v| {
                let units = TimeUnits::parse(&v.units()?)?;
                Some((v.dimensions()[0].clone(), units))
            })
            .collect();
        let normalizer = convention.date_patterns();
        let mut normalized = 0;
        for variable in &mut variables {
            let axis_units = variable.dimensions().first().and_then(|d| time_units.get(d));
            if normalizer.normalize(variable, axis_units) {
                normalized += 1;
            }
        }

        let variables: Vec<Arc<Variable>> = variables.into_iter().map(Arc::new).collect();
        let axes = find_axes(&variables, &listeners);
        info!(
            filename = %filename,
            variables = variables.len(),
            axes = axes.len(),
            normalized,
            "Opened decoder"
        );
        Ok(Self {
            filename,
            variables,
            axes,
            convention,
            config,
            listeners,
            local_cache: LocalGridCache::new(),
            global_cache,
            geometries: HashMap::new(),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn variables(&self) -> &[Arc<Variable>] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Arc<Variable>> {
        self.variables.iter().find(|v| v.name() == name)
    }

    /// All axes found in the file.
    pub fn axes(&self) -> &[Arc<Axis>] {
        &self.axes
    }

    pub fn convention(&self) -> &dyn Convention {
        self.convention.as_ref()
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn global_cache(&self) -> &Arc<GlobalGridCache> {
        &self.global_cache
    }

    /// Number of localization grids in the local cache.
    pub fn local_grid_count(&self) -> usize {
        self.local_cache.len()
    }

    /// Names of the variables that are neither axes nor grid mappings.
    pub fn data_variable_names(&self) -> Vec<String> {
        let axes: HashSet<&str> = self.axes.iter().map(|a| a.name()).collect();
        let mappings: HashSet<String> = self
            .variables
            .iter()
            .filter_map(|v| self.convention.name_of_mapping_node(v))
            .collect();
        self.variables
            .iter()
            .filter(|v| v.rank() > 0 && !axes.contains(v.name()) && !mappings.contains(v.name()))
            .map(|v| v.name().to_string())
            .collect()
    }

    /// The grid geometry of the named variable, or `None` if it has no grid.
    ///
    /// Errors concern this variable only.
    pub fn grid_geometry(&mut self, name: &str) -> Result<Option<GridGeometry>> {
        let variable = self
            .variable(name)
            .cloned()
            .ok_or_else(|| DecoderError::UnknownVariable(name.to_string()))?;
        let mapping = self
            .convention
            .name_of_mapping_node(&variable)
            .and_then(|m| self.variable(&m))
            .and_then(|m| GridMapping::parse(name, m, self.convention.as_ref(), &self.listeners));

        let mut adjustment = GridAdjustment::new();
        let grid = Grid::find(
            &variable,
            &self.axes,
            self.convention.as_ref(),
            &self.listeners,
            &mut adjustment,
        )?;
        let Some(grid) = grid else {
            return Ok(mapping.map(|m| {
                let extent = variable.dimensions().iter().rev().map(Dimension::length).collect();
                GridGeometry::new(extent, PixelInCell::CellCenter, None, Some(Arc::new(Crs::from(m.crs))))
            }));
        };

        let mut geometry = self.base_geometry(name, &grid)?;
        let sizes: Vec<usize> = grid
            .dimensions()
            .iter()
            .map(|d| adjustment.grid_to_variable.get(d).unwrap_or(d).length())
            .collect();
        if let Some(k) = (0..sizes.len()).find(|&k| sizes[k] != grid.dimensions()[k].length()) {
            let natural: Vec<Dimension> = grid.dimensions().iter().rev().cloned().collect();
            let Some(factors) = adjustment.data_to_grid_indices(&natural) else {
                self.listeners.report(DecoderEvent::ResamplingIntervalNotFound {
                    variable: name.to_string(),
                    dimension: grid.dimensions()[k].name().to_string(),
                });
                return Ok(None);
            };
            let extent = sizes.iter().rev().copied().collect();
            geometry = geometry.scaled(extent, &factors);
        }

        if let Some(mapping) = mapping {
            if geometry.is_linearized() {
                debug!(variable = name, mapping = %mapping.name, "Grid mapping ignored for linearized grid");
            } else if let Some(implicit) = geometry.crs() {
                let merged = CrsMerger::merge(implicit, &Crs::from(mapping.crs))?;
                if !Arc::ptr_eq(&merged, implicit) {
                    geometry = geometry.with_crs(merged);
                }
            }
        }
        Ok(Some(geometry))
    }

    /// Grid geometries of all data variables.
    ///
    /// Variables whose geometry cannot be created are reported to the listeners and skipped.
    pub fn grid_geometries(&mut self) -> Vec<(String, GridGeometry)> {
        let mut geometries = Vec::new();
        for name in self.data_variable_names() {
            match self.grid_geometry(&name) {
                Ok(Some(geometry)) => geometries.push((name, geometry)),
                Ok(None) => debug!(variable = %name, "Variable has no grid"),
                Err(e) => self.listeners.report(DecoderEvent::CannotCreateGridGeometry {
                    variable: name,
                    message: e.to_string(),
                }),
            }
        }
        geometries
    }

    /// The geometry of a grid before adjustment to a particular variable.
    fn base_geometry(&mut self, name: &str, grid: &Grid) -> Result<GridGeometry> {
        let signature: GridSignature = (
            grid.dimensions().to_vec(),
            grid.axes().iter().map(|a| a.name().to_string()).collect(),
        );
        if let Some(geometry) = self.geometries.get(&signature) {
            return Ok(geometry.clone());
        }
        let mut context = GridContext {
            convention: self.convention.as_ref(),
            config: &self.config,
            listeners: &self.listeners,
            local_cache: &mut self.local_cache,
            global_cache: &self.global_cache,
        };
        let geometry = grid.geometry(name, &mut context)?;
        self.geometries.insert(signature, geometry.clone());
        Ok(geometry)
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("filename", &self.filename)
            .field("variables", &self.variables.len())
            .field("axes", &self.axes.len())
            .field("convention", &self.convention)
            .finish()
    }
}

/// Classify the variables that may serve as axes.
///
/// Candidates are coordinate variables, variables listed in a `coordinates` attribute, and
/// two-dimensional longitude or latitude variables.
fn find_axes(variables: &[Arc<Variable>], listeners: &Listeners) -> Vec<Arc<Axis>> {
    let referenced: HashSet<String> = variables
        .iter()
        .filter_map(|v| v.attribute_as_string("coordinates"))
        .flat_map(|c| c.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .collect();
    let mut axes = Vec::new();
    for variable in variables {
        if variable.is_string() || variable.rank() == 0 {
            continue;
        }
        let Some(abbreviation) = AxisRoleResolver::abbreviation(variable, true) else {
            continue;
        };
        let is_candidate = variable.is_coordinate_variable()
            || referenced.contains(variable.name())
            || (variable.rank() == 2
                && matches!(abbreviation, AxisAbbreviation::Longitude | AxisAbbreviation::Latitude));
        if is_candidate {
            axes.push(Arc::new(Axis::new(Arc::clone(variable), abbreviation, listeners)));
        }
    }
    axes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder(variables: Vec<Variable>) -> Decoder {
        Decoder::new(
            "test.nc",
            variables,
            DecoderConfig::default(),
            Arc::new(GlobalGridCache::default()),
            Listeners::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DecoderConfig {
            global_cache_capacity: 0,
            ..Default::default()
        };
        let result = Decoder::new("test.nc", Vec::new(), config, Arc::new(GlobalGridCache::default()), Listeners::new());
        assert!(matches!(result, Err(DecoderError::InvalidConfig(_))));
    }

    #[test]
    fn test_axes_and_data_variables() {
        let (y, x) = (Dimension::new("lat", 2), Dimension::new("lon", 3));
        let decoder = decoder(vec![
            Variable::new("lat", vec![y.clone()])
                .with_attribute("units", "degrees_north")
                .with_values(vec![0.0, 1.0]),
            Variable::new("lon", vec![x.clone()])
                .with_attribute("units", "degrees_east")
                .with_values(vec![0.0, 1.0, 2.0]),
            Variable::new("sst", vec![y, x]).with_attribute("grid_mapping", "crs"),
            Variable::new("crs", Vec::new()).with_attribute("epsg_code", "EPSG:4326"),
        ]);
        assert_eq!(decoder.axes().len(), 2);
        assert_eq!(decoder.data_variable_names(), vec!["sst".to_string()]);
    }

    #[test]
    fn test_unknown_variable() {
        let mut decoder = decoder(Vec::new());
        assert!(matches!(decoder.grid_geometry("sst"), Err(DecoderError::UnknownVariable(_))));
    }

    #[test]
    fn test_dates_normalized_with_axis_units() {
        let time = Dimension::new("time", 2);
        let decoder = decoder(vec![
            Variable::new("time", vec![time.clone()])
                .with_attribute("units", "days since 2018-10-01")
                .with_values(vec![0.0, 1.0]),
            Variable::new("date", vec![time])
                .with_attribute("units", "day as %Y%m%d.%f")
                .with_values(vec![20181017.0, 20181017.5]),
        ]);
        let date = decoder.variable("date").unwrap();
        assert_eq!(date.units().as_deref(), Some("days since 2018-10-01 00:00:00"));
        assert_eq!(date.values().unwrap(), &[16.0, 16.5]);
    }

    #[test]
    fn test_dates_keep_their_unit_with_axis_epoch() {
        let time = Dimension::new("time", 1);
        let decoder = decoder(vec![
            Variable::new("time", vec![time.clone()])
                .with_attribute("units", "hours since 2018-10-01")
                .with_values(vec![0.0]),
            Variable::new("date", vec![time])
                .with_attribute("units", "day as %Y%m%d.%f")
                .with_values(vec![20181017.0]),
        ]);
        let date = decoder.variable("date").unwrap();
        assert_eq!(date.units().as_deref(), Some("days since 2018-10-01 00:00:00"));
        assert_eq!(date.values().unwrap(), &[16.0]);
    }
}
