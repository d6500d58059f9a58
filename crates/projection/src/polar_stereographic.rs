//! Polar Stereographic projection (variant A), as used by the Universal Polar Stereographic system.
//!
//! Formulas from Snyder, "Map Projections: A Working Manual", equations 21-33 to 21-40.

use crate::transform::MathTransform2D;
use georef_common::GeodeticDatum;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Scale factor at the pole of UPS.
pub const UPS_SCALE_FACTOR: f64 = 0.994;
/// False easting and false northing of UPS, in metres.
pub const UPS_FALSE_EASTING: f64 = 2_000_000.0;

/// Polar Stereographic projection centered on one pole.
///
/// Consumes (latitude, longitude) in degrees, produces (easting, northing) in metres
/// with the axis directions of the UPS definitions.
#[derive(Debug, Clone)]
pub struct PolarStereographic {
    /// Whether the projection is centered on the north pole
    pub north: bool,
    /// Longitude of origin in radians
    pub lon0: f64,
    /// Scale factor at the pole
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Semi-major axis (metres)
    pub a: f64,
    /// First eccentricity
    e: f64,
}

impl PolarStereographic {
    pub fn new(
        datum: &GeodeticDatum,
        north: bool,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            north,
            lon0: 0.0,
            k0,
            false_easting,
            false_northing,
            a: datum.semi_major_axis,
            e: datum.eccentricity_squared().sqrt(),
        }
    }

    /// UPS projection on WGS 84 for the given pole.
    pub fn ups(north: bool) -> Self {
        Self::new(
            &GeodeticDatum::wgs84(),
            north,
            UPS_SCALE_FACTOR,
            UPS_FALSE_EASTING,
            UPS_FALSE_EASTING,
        )
    }

    /// Distance from the pole on the projection plane for a unit t.
    fn rho_factor(&self) -> f64 {
        let e = self.e;
        2.0 * self.a * self.k0 / ((1.0 + e).powf(1.0 + e) * (1.0 - e).powf(1.0 - e)).sqrt()
    }

    /// Project geographic coordinates (degrees) to (easting, northing) in metres.
    pub fn project(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        // Work as if on the north pole; the south case mirrors latitude.
        let phi = if self.north { lat_deg } else { -lat_deg }.to_radians();
        let dlon = lon_deg.to_radians() - self.lon0;
        let es = self.e * phi.sin();
        let t = (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0);
        let rho = self.rho_factor() * t;

        let x = self.false_easting + rho * dlon.sin();
        let y = if self.north {
            self.false_northing - rho * dlon.cos()
        } else {
            self.false_northing + rho * dlon.cos()
        };
        (x, y)
    }

    /// Inverse projection from (easting, northing) in metres to (latitude, longitude) in degrees.
    pub fn unproject(&self, easting: f64, northing: f64) -> (f64, f64) {
        let dx = easting - self.false_easting;
        let dy = northing - self.false_northing;
        let rho = dx.hypot(dy);
        let t = rho / self.rho_factor();
        let chi = FRAC_PI_2 - 2.0 * t.atan();

        let e2 = self.e * self.e;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let e8 = e4 * e4;
        let phi = chi
            + (e2 / 2.0 + 5.0 * e4 / 24.0 + e6 / 12.0 + 13.0 * e8 / 360.0) * (2.0 * chi).sin()
            + (7.0 * e4 / 48.0 + 29.0 * e6 / 240.0 + 811.0 * e8 / 11520.0) * (4.0 * chi).sin()
            + (7.0 * e6 / 120.0 + 81.0 * e8 / 1120.0) * (6.0 * chi).sin()
            + (4279.0 * e8 / 161280.0) * (8.0 * chi).sin();

        let (phi, lambda) = if self.north {
            (phi, self.lon0 + dx.atan2(-dy))
        } else {
            (-phi, self.lon0 + dx.atan2(dy))
        };
        (phi.to_degrees(), lambda.to_degrees())
    }
}

impl MathTransform2D for PolarStereographic {
    fn transform(&self, lat: f64, lon: f64) -> (f64, f64) {
        // The opposite pole maps to infinity.
        let far = if self.north { lat <= -90.0 } else { lat >= 90.0 };
        if far || !(-90.0..=90.0).contains(&lat) {
            return (f64::NAN, f64::NAN);
        }
        self.project(lat, lon)
    }

    fn name(&self) -> String {
        if self.north {
            "Universal Polar Stereographic North".to_string()
        } else {
            "Universal Polar Stereographic South".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pole_maps_to_false_origin() {
        for north in [true, false] {
            let ups = PolarStereographic::ups(north);
            let lat = if north { 90.0 } else { -90.0 };
            let (x, y) = ups.project(lat, 45.0);
            assert!((x - 2_000_000.0).abs() < 1e-6);
            assert!((y - 2_000_000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_north_axes_point_south_along_meridians() {
        let ups = PolarStereographic::ups(true);
        // Easting grows toward 90°E, northing grows toward 180°.
        let (x, y) = ups.project(85.0, 90.0);
        assert!(x > 2_000_000.0);
        assert!((y - 2_000_000.0).abs() < 1e-6);
        let (x, y) = ups.project(85.0, 180.0);
        assert!((x - 2_000_000.0).abs() < 1e-6);
        assert!(y > 2_000_000.0);
    }

    #[test]
    fn test_inverse_roundtrip() {
        for north in [true, false] {
            let ups = PolarStereographic::ups(north);
            for (lat, lon) in [(85.0, 10.0), (87.5, -120.0), (81.0, 170.0)] {
                let lat = if north { lat } else { -lat };
                let (x, y) = ups.project(lat, lon);
                let (lat2, lon2) = ups.unproject(x, y);
                assert!((lat - lat2).abs() < 1e-8, "lat {} vs {}", lat, lat2);
                assert!((lon - lon2).abs() < 1e-8, "lon {} vs {}", lon, lon2);
            }
        }
    }
}
