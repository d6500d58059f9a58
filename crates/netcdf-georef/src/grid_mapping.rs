//! Explicit CRS declared by a CF grid mapping variable.
//!
//! Recognized declarations:
//!
//! | Attribute | Values |
//! |-----------|--------|
//! | `epsg_code` / `EPSG_code` | `"EPSG:4326"`, `"32631"`, UTM and UPS codes on WGS 84 |
//! | `grid_mapping_name` | `latitude_longitude`, `transverse_mercator` (UTM), `polar_stereographic` (UPS) |
//!
//! Ellipsoid parameters are read from `semi_major_axis` and `inverse_flattening`, or from
//! `earth_radius` for a sphere.

use crate::convention::Convention;
use crate::listeners::{DecoderEvent, Listeners};
use crate::variable::Variable;
use georef_common::{GeodeticDatum, Projection, SingleCrs};
use projection::transverse_mercator::{UTM_FALSE_EASTING, UTM_FALSE_NORTHING_SOUTH, UTM_SCALE_FACTOR};
use projection::polar_stereographic::{UPS_FALSE_EASTING, UPS_SCALE_FACTOR};
use tracing::debug;

/// Tolerance when comparing projection parameters to their universal values.
const PARAMETER_TOLERANCE: f64 = 1e-9;

/// A CRS parsed from a grid mapping variable.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMapping {
    /// Name of the grid mapping variable.
    pub name: String,
    pub crs: SingleCrs,
}

impl GridMapping {
    /// Parse the grid mapping variable referenced by the data variable `data_name`.
    ///
    /// Unsupported declarations are reported and `None` is returned.
    pub fn parse(
        data_name: &str,
        mapping: &Variable,
        convention: &dyn Convention,
        listeners: &Listeners,
    ) -> Option<Self> {
        let unsupported = |reason: String| {
            listeners.report(DecoderEvent::UnsupportedGridMapping {
                variable: data_name.to_string(),
                mapping: mapping.name().to_string(),
                reason,
            });
            None
        };

        let code = mapping
            .attribute_as_string("epsg_code")
            .or_else(|| mapping.attribute_as_string("EPSG_code"));
        if let Some(code) = code {
            let digits = code
                .trim()
                .strip_prefix("EPSG:")
                .or_else(|| code.trim().strip_prefix("epsg:"))
                .unwrap_or(code.trim());
            let crs = match digits.parse::<f64>() {
                Ok(v) if v.fract() == 0.0 && v > 0.0 && v <= u32::MAX as f64 => {
                    SingleCrs::from_epsg(v as u32)
                }
                _ => return unsupported(format!("\"{}\" is not an EPSG code", code)),
            };
            return match crs {
                Ok(crs) => Some(Self::new(mapping, crs)),
                Err(e) => unsupported(e.to_string()),
            };
        }

        let Some(method) = mapping.attribute_as_string("grid_mapping_name") else {
            return unsupported("no grid_mapping_name or EPSG code".to_string());
        };
        let datum = datum(mapping, convention, listeners);
        let parameter = |name: &str| mapping.attribute_as_number(name, listeners);

        let crs = match method.to_ascii_lowercase().as_str() {
            "latitude_longitude" => Ok(SingleCrs::geographic(datum, false)),
            "transverse_mercator" => universal_transverse_mercator(&parameter, &datum),
            "polar_stereographic" => universal_polar_stereographic(&parameter, &datum),
            other => Err(format!("\"{}\" is not a supported projection method", other)),
        };
        match crs {
            Ok(crs) => Some(Self::new(mapping, crs)),
            Err(reason) => unsupported(reason),
        }
    }

    fn new(mapping: &Variable, crs: SingleCrs) -> Self {
        debug!(mapping = mapping.name(), crs = %crs, "Parsed grid mapping");
        Self {
            name: mapping.name().to_string(),
            crs,
        }
    }
}

fn datum(mapping: &Variable, convention: &dyn Convention, listeners: &Listeners) -> GeodeticDatum {
    if let Some(radius) = mapping.attribute_as_number("earth_radius", listeners) {
        return GeodeticDatum::sphere(radius);
    }
    let mut datum = convention.default_datum();
    let a = mapping.attribute_as_number("semi_major_axis", listeners);
    let inverse_flattening = mapping.attribute_as_number("inverse_flattening", listeners);
    if let Some(a) = a {
        let inverse_flattening = inverse_flattening.unwrap_or(f64::INFINITY);
        if !datum.same_ellipsoid(&GeodeticDatum {
            name: String::new(),
            semi_major_axis: a,
            inverse_flattening,
        }) {
            datum = GeodeticDatum {
                name: "Unknown datum".to_string(),
                semi_major_axis: a,
                inverse_flattening,
            };
        }
    }
    datum
}

fn close(actual: Option<f64>, expected: f64) -> bool {
    actual.map_or(true, |v| (v - expected).abs() <= PARAMETER_TOLERANCE * expected.abs().max(1.0))
}

fn require_wgs84(datum: &GeodeticDatum) -> Result<(), String> {
    if datum.same_ellipsoid(&GeodeticDatum::wgs84()) {
        Ok(())
    } else {
        Err(format!("only WGS 84 is supported for projections, not {}", datum.name))
    }
}

fn universal_transverse_mercator(
    parameter: &dyn Fn(&str) -> Option<f64>,
    datum: &GeodeticDatum,
) -> Result<SingleCrs, String> {
    require_wgs84(datum)?;
    let central = parameter("longitude_of_central_meridian")
        .ok_or_else(|| "missing longitude_of_central_meridian".to_string())?;
    let zone = (central + 183.0) / 6.0;
    let false_northing = parameter("false_northing").unwrap_or(0.0);
    let north = false_northing.abs() < PARAMETER_TOLERANCE;
    let valid = zone.fract().abs() < PARAMETER_TOLERANCE
        && (1.0..=60.0).contains(&zone)
        && close(parameter("scale_factor_at_central_meridian"), UTM_SCALE_FACTOR)
        && close(parameter("false_easting"), UTM_FALSE_EASTING)
        && close(parameter("latitude_of_projection_origin"), 0.0)
        && (north || close(Some(false_northing), UTM_FALSE_NORTHING_SOUTH));
    if !valid {
        return Err("transverse Mercator parameters are not those of a UTM zone".to_string());
    }
    Ok(SingleCrs::universal(Projection::TransverseMercator {
        zone: zone.round() as u8,
        north,
    }))
}

fn universal_polar_stereographic(
    parameter: &dyn Fn(&str) -> Option<f64>,
    datum: &GeodeticDatum,
) -> Result<SingleCrs, String> {
    require_wgs84(datum)?;
    let origin = parameter("latitude_of_projection_origin")
        .ok_or_else(|| "missing latitude_of_projection_origin".to_string())?;
    let valid = (origin.abs() - 90.0).abs() < PARAMETER_TOLERANCE
        && close(parameter("straight_vertical_longitude_from_pole"), 0.0)
        && close(parameter("scale_factor_at_projection_origin"), UPS_SCALE_FACTOR)
        && close(parameter("false_easting"), UPS_FALSE_EASTING)
        && close(parameter("false_northing"), UPS_FALSE_EASTING);
    if !valid {
        return Err("polar stereographic parameters are not those of UPS".to_string());
    }
    Ok(SingleCrs::universal(Projection::PolarStereographic {
        north: origin > 0.0,
    }))
}
