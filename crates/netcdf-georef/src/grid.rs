//! Grids: sets of dimensions with the axes giving their coordinates.
//!
//! A grid may be shared by many data variables. Its dimensions are kept in netCDF order
//! (slowest varying first) while its axes are in CRS order: sorted by the natural index
//! (fastest varying first) of their first grid dimension, then by role.

use crate::axis::Axis;
use crate::config::DecoderConfig;
use crate::convention::Convention;
use crate::crs_builder::CrsBuilder;
use crate::error::{DecoderError, Result};
use crate::grid_adjustment::GridAdjustment;
use crate::grid_cache::{GlobalGridCache, GlobalKey, GridCacheValue, LocalGridCache, LocalKey};
use crate::grid_geometry::{GridGeometry, GridToCrs, PixelInCell, TransformStep};
use crate::linearizer::{self, Linearizer, Replacement};
use crate::listeners::{DecoderEvent, Listeners};
use crate::variable::{Dimension, Variable};
use georef_common::Crs;
use nalgebra::DMatrix;
use projection::{LocalizationGridBuilder, LocalizationGridError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Longitude period, in degrees.
const LONGITUDE_PERIOD: f64 = 360.0;

/// Services needed to build the geometry of a grid.
pub struct GridContext<'a> {
    pub convention: &'a dyn Convention,
    pub config: &'a DecoderConfig,
    pub listeners: &'a Listeners,
    pub local_cache: &'a mut LocalGridCache,
    pub global_cache: &'a GlobalGridCache,
}

/// Dimensions and axes of a grid.
#[derive(Debug, Clone)]
pub struct Grid {
    dimensions: Vec<Dimension>,
    axes: Vec<Arc<Axis>>,
}

impl Grid {
    /// Build the grid of the given dimensions (netCDF order) from the candidate axes.
    ///
    /// Only axes whose dimensions are all in `dimensions` are kept. When two axes play the
    /// same role, the one of lowest rank wins (a coordinate variable over an auxiliary 2-D
    /// coordinate). Dimensions without axis are dropped. Returns `None` if no axis remains.
    pub fn for_dimensions(dimensions: &[Dimension], candidates: &[Arc<Axis>]) -> Option<Grid> {
        let n = dimensions.len();
        let natural = |d: &Dimension| dimensions.iter().position(|x| x == d).map(|k| n - 1 - k);

        let mut axes: Vec<Arc<Axis>> = Vec::new();
        for axis in candidates {
            if axis.dimensions().is_empty() || axis.dimensions().iter().any(|d| natural(d).is_none()) {
                continue;
            }
            match axes.iter().position(|a| a.role() == axis.role()) {
                Some(i) if axes[i].dimensions().len() > axis.dimensions().len() => {
                    axes[i] = Arc::clone(axis);
                }
                Some(_) => {}
                None => axes.push(Arc::clone(axis)),
            }
        }
        if axes.is_empty() {
            return None;
        }
        let first_natural = |a: &Arc<Axis>| a.dimensions().iter().filter_map(natural).min().unwrap_or(n);
        axes.sort_by_key(|a| (first_natural(a), a.role()));

        let used: HashSet<&Dimension> = axes.iter().flat_map(|a| a.dimensions()).collect();
        let dimensions: Vec<Dimension> = dimensions.iter().filter(|d| used.contains(d)).cloned().collect();
        Some(Grid { dimensions, axes })
    }

    /// Find the grid of a variable.
    ///
    /// Variable dimensions are first matched directly against the dimensions of the axes.
    /// Remaining dimensions are related to axis dimensions through the labels given by the
    /// convention (see [`GridAdjustment`]). Returns `None` if some dimension cannot be related.
    pub fn find(
        variable: &Variable,
        axes: &[Arc<Axis>],
        convention: &dyn Convention,
        listeners: &Listeners,
        adjustment: &mut GridAdjustment,
    ) -> Result<Option<Grid>> {
        let candidates: Vec<Arc<Axis>> = match convention.names_of_axis_variables(variable) {
            Some(names) => axes
                .iter()
                .filter(|a| names.iter().any(|n| n == a.name()))
                .cloned()
                .collect(),
            None => axes.to_vec(),
        };
        let mut unclaimed: HashSet<Dimension> = candidates
            .iter()
            .flat_map(|a| a.dimensions().iter().cloned())
            .collect();
        let mut dimensions: Vec<Option<Dimension>> = variable
            .dimensions()
            .iter()
            .map(|d| unclaimed.remove(d).then(|| d.clone()))
            .collect();

        if dimensions.iter().any(Option::is_none) {
            let mut labels = None;
            for (i, slot) in dimensions.iter_mut().enumerate() {
                if slot.is_some() {
                    continue;
                }
                let Some(label) = convention.name_of_dimension(variable, i) else {
                    return Ok(None);
                };
                if labels.is_none() {
                    let variables: Vec<Arc<Variable>> =
                        candidates.iter().map(|a| Arc::clone(a.variable())).collect();
                    labels = Some(adjustment.map_label_to_grid_dimensions(
                        variable,
                        &variables,
                        &unclaimed,
                        convention,
                        listeners,
                    )?);
                }
                let Some(grid_dimension) = labels.as_mut().and_then(|l| l.remove(&label)) else {
                    listeners.report(DecoderEvent::CannotRelateDimension {
                        variable: variable.name().to_string(),
                        dimension: label,
                    });
                    return Ok(None);
                };
                let variable_dimension = variable.dimensions()[i].clone();
                if adjustment
                    .grid_to_variable
                    .insert(grid_dimension.clone(), variable_dimension)
                    .is_some()
                {
                    return Err(DecoderError::internal(format!(
                        "grid dimension {:?} related twice",
                        grid_dimension
                    )));
                }
                *slot = Some(grid_dimension);
            }
        }
        let dimensions: Vec<Dimension> = dimensions.into_iter().flatten().collect();
        Ok(Self::for_dimensions(&dimensions, &candidates))
    }

    /// Dimensions of this grid, in netCDF order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Axes of this grid, in CRS order.
    pub fn axes(&self) -> &[Arc<Axis>] {
        &self.axes
    }

    /// Number of cells per dimension, in natural order.
    pub fn extent(&self) -> Vec<usize> {
        self.dimensions.iter().rev().map(Dimension::length).collect()
    }

    fn natural_index(&self, dimension: &Dimension) -> Option<usize> {
        let n = self.dimensions.len();
        self.dimensions.iter().position(|d| d == dimension).map(|k| n - 1 - k)
    }

    /// Build the grid geometry from the axes.
    ///
    /// Regular one-dimensional axes become coefficients of the affine matrix; irregular
    /// ones become interpolation steps. Two-dimensional axes are paired into localization
    /// grids, fitted once per pair of axes through the caches.
    pub fn geometry(&self, variable: &str, context: &mut GridContext<'_>) -> Result<GridGeometry> {
        let n = self.dimensions.len();
        if self.axes.len() != n {
            return Err(DecoderError::mismatched_grid(
                variable,
                format!("{} axes for {} grid dimensions", self.axes.len(), n),
            ));
        }
        let mut affine = DMatrix::<f64>::zeros(n + 1, n + 1);
        affine[(n, n)] = 1.0;
        let mut steps = Vec::new();
        let mut replacements = Vec::new();
        let mut done = vec![false; n];

        for (i, axis) in self.axes.iter().enumerate() {
            if done[i] {
                continue;
            }
            match axis.dimensions() {
                [dimension] => {
                    let d = self.natural(dimension, variable)?;
                    match axis.regular_spacing() {
                        Some((start, step)) => {
                            affine[(i, d)] = step;
                            affine[(i, n)] = start;
                        }
                        None => {
                            affine[(i, d)] = 1.0;
                            steps.push(TransformStep::Interpolation {
                                dimension: d,
                                values: axis.values().to_vec(),
                            });
                        }
                    }
                    done[i] = true;
                }
                [_, _] => {
                    let j = (i + 1..n)
                        .find(|&j| !done[j] && same_dimensions(axis, &self.axes[j]))
                        .ok_or_else(|| {
                            DecoderError::mismatched_grid(
                                variable,
                                format!("no axis to pair with two-dimensional axis \"{}\"", axis.name()),
                            )
                        })?;
                    let partner = &self.axes[j];
                    let [a, b] = [&axis.dimensions()[0], &axis.dimensions()[1]];
                    let (da, db) = (self.natural(a, variable)?, self.natural(b, variable)?);
                    let (p, q) = (da.min(db), da.max(db));
                    let value = self.localization(variable, axis, partner, p, q, context)?;
                    if let Some(target) = value.output_crs() {
                        replacements.push(Replacement {
                            first_dimension: i,
                            target,
                        });
                    }
                    steps.push(TransformStep::Localization {
                        dimensions: [p, q],
                        grid: Arc::clone(&value.grid),
                    });
                    affine[(i, p)] = 1.0;
                    affine[(j, q)] = 1.0;
                    done[i] = true;
                    done[j] = true;
                }
                _ => {
                    return Err(DecoderError::mismatched_grid(
                        variable,
                        format!("axis \"{}\" has more than two dimensions", axis.name()),
                    ));
                }
            }
        }

        let crs = CrsBuilder::build(&self.axes, &context.convention.default_datum())?;
        let mut components = crs.components().to_vec();
        linearizer::replace_in_compound_crs(&mut components, &replacements, Some(&mut affine))?;
        let crs = Crs::compound(components)?;
        Ok(GridGeometry::new(
            self.extent(),
            PixelInCell::CellCenter,
            Some(GridToCrs::new(steps, affine)),
            Some(Arc::new(crs)),
        ))
    }

    fn natural(&self, dimension: &Dimension, variable: &str) -> Result<usize> {
        self.natural_index(dimension).ok_or_else(|| {
            DecoderError::mismatched_grid(variable, format!("dimension {:?} is not in the grid", dimension))
        })
    }

    /// Get the localization grid of two axes from the caches, fitting it if needed.
    ///
    /// `p` and `q` are the natural indices of the grid x and y dimensions.
    fn localization(
        &self,
        variable: &str,
        first: &Arc<Axis>,
        second: &Arc<Axis>,
        p: usize,
        q: usize,
        context: &mut GridContext<'_>,
    ) -> Result<Arc<GridCacheValue>> {
        let n = self.dimensions.len();
        let (width, height) = (self.dimensions[n - 1 - p].length(), self.dimensions[n - 1 - q].length());
        let x_dimension = &self.dimensions[n - 1 - p];
        let transposed = [first, second].map(|a| a.dimensions().last() != Some(x_dimension));
        let key = LocalKey::new(width, height, Arc::clone(first), Arc::clone(second))
            .with_transposed(transposed);
        if let Some(value) = context.local_cache.get(&key) {
            return Ok(value);
        }
        let linearizers = if is_geographic_pair(first, second) {
            context.convention.linearizers()
        } else {
            Default::default()
        };
        let global = GlobalKey::new(&key, &linearizers, context.config.digest_buffer_size)
            .with_desired_precision(context.config.desired_precision);
        let value = context.global_cache.get_or_compute(&global, || {
            let started = Instant::now();
            let mut builder = LocalizationGridBuilder::new(width, height)?;
            builder.set_control_points(0, &row_major(first, transposed[0], width, height))?;
            builder.set_control_points(1, &row_major(second, transposed[1], width, height))?;
            builder.set_desired_precision(context.config.desired_precision);
            for (dimension, axis) in [first, second].into_iter().enumerate() {
                if axis.is_longitude() {
                    builder.resolve_wraparound_axis(dimension, LONGITUDE_PERIOD);
                }
            }
            let candidates =
                Linearizer::set_candidates_on_grid(&linearizers, &mut builder, first.is_longitude());
            let grid = builder
                .create()
                .map_err(|e| with_potential_cause(e, &candidates, variable, context.listeners))?;
            let selected = grid.linearizer().and_then(|k| candidates.get(k));
            debug!(
                variable,
                width,
                height,
                linearizer = selected.map(|l| l.target_crs().name.as_str()),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Computed localization grid"
            );
            Ok::<_, DecoderError>(GridCacheValue {
                target: selected.map(|l| l.target_crs().clone()),
                axis_swap: selected.is_some_and(Linearizer::axis_swap),
                grid: Arc::new(grid),
            })
        })?;
        Ok(context.local_cache.insert_if_absent(key, value))
    }
}

fn same_dimensions(a: &Axis, b: &Axis) -> bool {
    let (da, db) = (a.dimensions(), b.dimensions());
    da.len() == db.len() && da.iter().all(|d| db.contains(d))
}

fn is_geographic_pair(a: &Axis, b: &Axis) -> bool {
    (a.is_longitude() && b.is_latitude()) || (a.is_latitude() && b.is_longitude())
}

/// Values of a two-dimensional axis with the grid x dimension varying fastest.
fn row_major(axis: &Axis, transposed: bool, width: usize, height: usize) -> Vec<f64> {
    let values = axis.values();
    if !transposed {
        return values.to_vec();
    }
    let mut transposed = vec![f64::NAN; width * height];
    for x in 0..width {
        for y in 0..height {
            if let Some(v) = values.get(x * height + y) {
                transposed[y * width + x] = *v;
            }
        }
    }
    transposed
}

/// Report the span diagnostic of the linearizers and attach it to the error.
fn with_potential_cause(
    error: LocalizationGridError,
    linearizers: &[Linearizer],
    variable: &str,
    listeners: &Listeners,
) -> DecoderError {
    let Some((linearizer, cause)) = linearizers
        .iter()
        .find_map(|l| l.potential_cause().map(|c| (l, c)))
    else {
        return error.into();
    };
    listeners.report(DecoderEvent::GridSpanTooWide {
        variable: variable.to_string(),
        span: linearizer.longitude_span(),
        projection: linearizer.target_crs().name.clone(),
    });
    error.with_potential_cause(cause).into()
}
