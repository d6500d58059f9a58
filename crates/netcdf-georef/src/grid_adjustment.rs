//! Relation between the dimensions of a data variable and a smaller localization grid.
//!
//! Some producers store longitudes and latitudes only every n-th data cell. The localization
//! grid then has its own dimensions, unrelated by name to the dimensions of the data, and
//! attributes give a common label to the corresponding dimensions of both variables:
//!
//! ```text
//! float Latitude(grid_y, grid_x) ;   dim0 = "Line grids"  dim1 = "Pixel grids"  resampling_interval = 10
//! ushort SST(data_y, data_x) ;       dim0 = "Line grids"  dim1 = "Pixel grids"
//! ```

use crate::convention::Convention;
use crate::error::{DecoderError, Result};
use crate::listeners::Listeners;
use crate::variable::{Dimension, Variable};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Dimension relations collected while resolving the grid of one variable.
///
/// Never shared between variables.
#[derive(Debug, Default)]
pub struct GridAdjustment {
    /// Grid dimension to the variable dimension it stands for, when they differ.
    pub grid_to_variable: HashMap<Dimension, Dimension>,
    /// Factor converting grid indices to data indices, per grid dimension.
    grid_to_data_indices: HashMap<Dimension, f64>,
}

impl GridAdjustment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the dimension labels of all axes to their grid dimensions.
    ///
    /// Only dimensions in `unclaimed` are considered. When the same label designates two
    /// different dimensions, the dimension of the axis explicitly expected by the convention
    /// for `variable` is kept; if neither or both are expected, the labels are ambiguous and
    /// a `DuplicatedIdentifier` error is returned.
    pub fn map_label_to_grid_dimensions(
        &mut self,
        variable: &Variable,
        axes: &[Arc<Variable>],
        unclaimed: &HashSet<Dimension>,
        convention: &dyn Convention,
        listeners: &Listeners,
    ) -> Result<HashMap<String, Dimension>> {
        let requested = convention.names_of_axis_variables(variable).unwrap_or_default();
        let is_requested = |name: &str| requested.iter().any(|r| r == name);
        let mut labels: HashMap<String, (Dimension, String)> = HashMap::new();

        for axis in axes {
            let factor = convention
                .grid_to_data_indices(axis, listeners)
                .unwrap_or(1.0);
            for (index, dimension) in axis.dimensions().iter().enumerate() {
                if !unclaimed.contains(dimension) {
                    continue;
                }
                let Some(label) = convention.name_of_dimension(axis, index) else {
                    continue;
                };
                match labels.get(&label) {
                    None => {}
                    Some((existing, _)) if existing == dimension => continue,
                    Some((_, owner)) => {
                        let keep_new = is_requested(axis.name());
                        if keep_new == is_requested(owner) {
                            return Err(DecoderError::duplicated_identifier(
                                variable.name(),
                                label,
                                owner.clone(),
                                axis.name(),
                            ));
                        }
                        if !keep_new {
                            continue;
                        }
                    }
                }
                self.grid_to_data_indices.insert(dimension.clone(), factor);
                labels.insert(label, (dimension.clone(), axis.name().to_string()));
            }
        }
        debug!(
            variable = variable.name(),
            labels = labels.len(),
            "Mapped dimension labels to grid dimensions"
        );
        Ok(labels.into_iter().map(|(label, (dim, _))| (label, dim)).collect())
    }

    /// Factor converting grid indices to data indices for the given grid dimension.
    pub fn resampling_interval(&self, dimension: &Dimension) -> Option<f64> {
        self.grid_to_data_indices.get(dimension).copied()
    }

    /// Factors converting data indices to grid indices, one per given grid dimension.
    ///
    /// Dimensions without a recorded factor map 1:1. Returns `None` if any recorded
    /// factor is not a finite positive number.
    pub fn data_to_grid_indices(&self, grid_dimensions: &[Dimension]) -> Option<Vec<f64>> {
        if self
            .grid_to_data_indices
            .values()
            .any(|f| !(f.is_finite() && *f > 0.0))
        {
            return None;
        }
        Some(
            grid_dimensions
                .iter()
                .map(|d| 1.0 / self.resampling_interval(d).unwrap_or(1.0))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::CfConvention;
    use crate::linearizer::LinearizerKind;
    use crate::date_encoding::DateEncodingNormalizer;
    use std::collections::BTreeSet;

    /// A convention expecting the given axis variables.
    #[derive(Debug)]
    struct Expecting(Vec<String>);

    impl Convention for Expecting {
        fn names_of_axis_variables(&self, _data: &Variable) -> Option<Vec<String>> {
            Some(self.0.clone())
        }

        fn linearizers(&self) -> BTreeSet<LinearizerKind> {
            BTreeSet::new()
        }

        fn date_patterns(&self) -> DateEncodingNormalizer {
            DateEncodingNormalizer::new(&Default::default())
        }
    }

    fn labelled(name: &str, dims: &[Dimension], interval: Option<f64>) -> Arc<Variable> {
        let mut var = Variable::new(name, dims.to_vec())
            .with_attributes(&[("dim0", "Line grids"), ("dim1", "Pixel grids")]);
        if let Some(i) = interval {
            var = var.with_attribute("resampling_interval", i);
        }
        Arc::new(var)
    }

    fn data() -> Variable {
        Variable::new("sst", vec![Dimension::new("data_y", 91), Dimension::new("data_x", 91)])
            .with_attributes(&[("dim0", "Line grids"), ("dim1", "Pixel grids")])
    }

    #[test]
    fn test_labels_and_scale() {
        let (gy, gx) = (Dimension::new("grid_y", 10), Dimension::new("grid_x", 10));
        let dims = [gy.clone(), gx.clone()];
        let axes = vec![labelled("Latitude", &dims, Some(10.0)), labelled("Longitude", &dims, Some(10.0))];
        let unclaimed: HashSet<Dimension> = dims.iter().cloned().collect();

        let mut adjustment = GridAdjustment::new();
        let labels = adjustment
            .map_label_to_grid_dimensions(&data(), &axes, &unclaimed, &CfConvention::default(), &Listeners::new())
            .unwrap();
        assert_eq!(labels.get("Line grids"), Some(&gy));
        assert_eq!(labels.get("Pixel grids"), Some(&gx));
        assert_eq!(adjustment.data_to_grid_indices(&[gx, gy]), Some(vec![0.1, 0.1]));
    }

    #[test]
    fn test_invalid_scale_means_no_scaling() {
        let dims = [Dimension::new("grid_y", 10), Dimension::new("grid_x", 10)];
        let axes = vec![labelled("Latitude", &dims, Some(0.0))];
        let unclaimed: HashSet<Dimension> = dims.iter().cloned().collect();
        let mut adjustment = GridAdjustment::new();
        adjustment
            .map_label_to_grid_dimensions(&data(), &axes, &unclaimed, &CfConvention::default(), &Listeners::new())
            .unwrap();
        assert_eq!(adjustment.data_to_grid_indices(&dims), None);
    }

    #[test]
    fn test_duplicated_label() {
        let first = [Dimension::new("grid_y", 10), Dimension::new("grid_x", 10)];
        let second = [Dimension::new("tie_y", 5), Dimension::new("tie_x", 5)];
        let axes = vec![labelled("Latitude", &first, None), labelled("TiePointLatitude", &second, None)];
        let unclaimed: HashSet<Dimension> = first.iter().chain(&second).cloned().collect();

        let mut adjustment = GridAdjustment::new();
        let err = adjustment
            .map_label_to_grid_dimensions(&data(), &axes, &unclaimed, &CfConvention::default(), &Listeners::new())
            .unwrap_err();
        assert!(matches!(err, DecoderError::DuplicatedIdentifier { ref label, .. } if label == "Line grids"));

        // Resolved in favor of the axis expected by the convention.
        let convention = Expecting(vec!["TiePointLatitude".to_string()]);
        let mut adjustment = GridAdjustment::new();
        let labels = adjustment
            .map_label_to_grid_dimensions(&data(), &axes, &unclaimed, &convention, &Listeners::new())
            .unwrap();
        assert_eq!(labels.get("Line grids"), Some(&second[0]));
        assert_eq!(labels.get("Pixel grids"), Some(&second[1]));
    }
}
