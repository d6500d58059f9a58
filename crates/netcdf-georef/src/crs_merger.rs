//! Merge of the CRS inferred from coordinate variables with an explicit CRS.
//!
//! The implicit CRS knows every dimension of the grid (for example longitude, latitude,
//! depth and time) but only generic definitions. A grid mapping variable gives an exact
//! definition of some components only (for example the horizontal one). The merger injects
//! the explicit components in place of the implicit ones.

use georef_common::{
    AxesConvention, Crs, ReferencingError, ReferencingResult, SingleCrs,
};
use std::sync::Arc;
use tracing::debug;

/// Combines implicit and explicit CRS.
pub struct CrsMerger;

impl CrsMerger {
    /// Inject `explicit` into `implicit`.
    ///
    /// The first dimension to replace is the one where the axes of `explicit` appear with
    /// colinear directions, retrying with `explicit` in right-handed axis order, or 0 if
    /// neither matches. Returns `implicit` itself when the merge changes nothing but names,
    /// axis order or conventions.
    pub fn merge(implicit: &Arc<Crs>, explicit: &Crs) -> ReferencingResult<Arc<Crs>> {
        let (first, mut explicit) = match implicit.index_of_colinear(explicit) {
            Some(i) => (i, explicit.clone()),
            None => {
                let normalized = explicit.for_convention(AxesConvention::RightHanded);
                (implicit.index_of_colinear(&normalized).unwrap_or(0), normalized)
            }
        };
        if uses_positive_range_at(implicit, first) {
            explicit = explicit.for_convention(AxesConvention::PositiveRange);
        }
        let merged = replace_component(implicit, first, &explicit)?;
        if merged.equivalent(implicit) {
            debug!(crs = %implicit, "Explicit CRS is equivalent to the implicit one");
            return Ok(Arc::clone(implicit));
        }
        debug!(implicit = %implicit, merged = %merged, first, "Merged explicit CRS");
        Ok(Arc::new(merged))
    }
}

/// Whether the component of `crs` starting at `first` is geographic with a [0°, 360°) longitude.
fn uses_positive_range_at(crs: &Crs, first: usize) -> bool {
    component_starting_at(crs, first).is_some_and(|i| {
        let c = &crs.components()[i];
        c.is_geographic() && c.axes.iter().any(|a| a.uses_positive_range())
    })
}

fn component_starting_at(crs: &Crs, first: usize) -> Option<usize> {
    (0..crs.components().len()).find(|&i| crs.first_dimension_of(i) == first)
}

/// Replace the components of `implicit` covering the dimensions of `explicit` from `first`.
///
/// Fails if `first` is not the start of a component, or if the dimensions of `explicit`
/// do not end on a component boundary.
pub fn replace_component(implicit: &Crs, first: usize, explicit: &Crs) -> ReferencingResult<Crs> {
    let fail = || ReferencingError::cannot_inject(explicit.name(), implicit.name());
    let start = component_starting_at(implicit, first).ok_or_else(fail)?;
    let components = implicit.components();
    let mut end = start;
    let mut covered = 0;
    while covered < explicit.dimension() {
        let component = components.get(end).ok_or_else(fail)?;
        covered += component.dimension();
        end += 1;
    }
    if covered != explicit.dimension() {
        return Err(fail());
    }
    let merged: Vec<SingleCrs> = components[..start]
        .iter()
        .chain(explicit.components())
        .chain(&components[end..])
        .cloned()
        .collect();
    Crs::compound(merged)
}
