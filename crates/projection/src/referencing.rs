//! Lookup of the universal projected CRS for a geographic location.

use crate::polar_stereographic::PolarStereographic;
use crate::transform::MathTransform2D;
use crate::transverse_mercator::TransverseMercator;
use georef_common::{Projection, SingleCrs};
use std::sync::Arc;

/// Southernmost latitude covered by UTM zones.
pub const UTM_SOUTH_BOUND: f64 = -80.0;
/// Northernmost latitude covered by UTM zones.
pub const UTM_NORTH_BOUND: f64 = 84.0;
/// Width of a UTM zone in degrees of longitude.
pub const ZONE_WIDTH: f64 = 6.0;

/// Select the universal projection for the given point: a UTM zone between 80°S and 84°N,
/// or UPS beyond. Zone exceptions of southwest Norway and Svalbard are applied.
pub fn universal_projection(latitude: f64, longitude: f64) -> Projection {
    if !(UTM_SOUTH_BOUND..=UTM_NORTH_BOUND).contains(&latitude) {
        return Projection::PolarStereographic {
            north: latitude > 0.0,
        };
    }
    let lon = normalize_longitude(longitude);
    let mut zone = ((lon + 180.0) / ZONE_WIDTH).floor() as i32 + 1;
    zone = zone.clamp(1, 60);

    if (56.0..64.0).contains(&latitude) && (3.0..12.0).contains(&lon) {
        // Southwest Norway
        zone = 32;
    } else if latitude >= 72.0 {
        // Svalbard: zones 32, 34 and 36 are not used.
        zone = match lon {
            l if (0.0..9.0).contains(&l) => 31,
            l if (9.0..21.0).contains(&l) => 33,
            l if (21.0..33.0).contains(&l) => 35,
            l if (33.0..42.0).contains(&l) => 37,
            _ => zone,
        };
    }

    Projection::TransverseMercator {
        zone: zone as u8,
        north: latitude >= 0.0,
    }
}

/// The universal projected CRS (WGS 84 / UTM or UPS) for the given point.
pub fn universal_crs(latitude: f64, longitude: f64) -> SingleCrs {
    SingleCrs::universal(universal_projection(latitude, longitude))
}

/// The forward projection for the given universal projection, consuming (latitude, longitude).
pub fn universal_transform(projection: Projection) -> Arc<dyn MathTransform2D> {
    match projection {
        Projection::TransverseMercator { zone, north } => {
            Arc::new(TransverseMercator::utm(zone, north))
        }
        Projection::PolarStereographic { north } => Arc::new(PolarStereographic::ups(north)),
    }
}

/// Bring a longitude into [-180°, 180°).
pub fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm(zone: u8, north: bool) -> Projection {
        Projection::TransverseMercator { zone, north }
    }

    #[test]
    fn test_regular_zones() {
        assert_eq!(universal_projection(0.0, 3.0), utm(31, true));
        assert_eq!(universal_projection(-33.9, 18.4), utm(34, false));
        assert_eq!(universal_projection(40.0, -180.0), utm(1, true));
        assert_eq!(universal_projection(40.0, 179.9), utm(60, true));
        assert_eq!(universal_projection(40.0, 363.0), utm(31, true));
    }

    #[test]
    fn test_norway_exception() {
        assert_eq!(universal_projection(60.0, 5.0), utm(32, true));
        assert_eq!(universal_projection(55.0, 5.0), utm(31, true));
    }

    #[test]
    fn test_svalbard_exception() {
        assert_eq!(universal_projection(78.0, 8.0), utm(31, true));
        assert_eq!(universal_projection(78.0, 15.0), utm(33, true));
        assert_eq!(universal_projection(78.0, 25.0), utm(35, true));
        assert_eq!(universal_projection(78.0, 40.0), utm(37, true));
    }

    #[test]
    fn test_polar_regions() {
        assert_eq!(
            universal_projection(85.0, 0.0),
            Projection::PolarStereographic { north: true }
        );
        assert_eq!(
            universal_projection(-81.0, 0.0),
            Projection::PolarStereographic { north: false }
        );
        assert_eq!(universal_projection(84.0, 0.0), utm(31, true));
        assert_eq!(universal_crs(-85.0, 10.0).identifier, Some(32761));
    }
}
