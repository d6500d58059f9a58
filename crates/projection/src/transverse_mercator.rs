//! Transverse Mercator projection, as used by the Universal Transverse Mercator system.
//!
//! Series expansions from Snyder, "Map Projections: A Working Manual" (USGS 1395),
//! equations 8-9 to 8-25. Accuracy is better than a millimetre within the 6° zones.

use crate::transform::MathTransform2D;
use georef_common::GeodeticDatum;
use std::f64::consts::PI;

/// Scale factor on the central meridian of UTM zones.
pub const UTM_SCALE_FACTOR: f64 = 0.9996;
/// False easting of UTM zones, in metres.
pub const UTM_FALSE_EASTING: f64 = 500_000.0;
/// False northing of UTM zones in the southern hemisphere, in metres.
pub const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Transverse Mercator projection parameters.
///
/// The projection consumes (latitude, longitude) in degrees and produces
/// (easting, northing) in metres.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    /// False easting (metres)
    pub false_easting: f64,
    /// False northing (metres)
    pub false_northing: f64,
    /// Semi-major axis (metres)
    pub a: f64,
    /// First eccentricity squared
    e2: f64,
    /// Second eccentricity squared
    ep2: f64,
    /// UTM zone, if this projection was created for one
    zone: Option<(u8, bool)>,
}

impl TransverseMercator {
    /// Create a projection on the given ellipsoid.
    pub fn new(
        datum: &GeodeticDatum,
        central_meridian_deg: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let e2 = datum.eccentricity_squared();
        Self {
            lon0: central_meridian_deg.to_radians(),
            k0,
            false_easting,
            false_northing,
            a: datum.semi_major_axis,
            e2,
            ep2: e2 / (1.0 - e2),
            zone: None,
        }
    }

    /// UTM projection on WGS 84 for the given zone (1-60) and hemisphere.
    pub fn utm(zone: u8, north: bool) -> Self {
        let mut tm = Self::new(
            &GeodeticDatum::wgs84(),
            central_meridian(zone),
            UTM_SCALE_FACTOR,
            UTM_FALSE_EASTING,
            if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH },
        );
        tm.zone = Some((zone, north));
        tm
    }

    /// Meridian distance from the equator to the given latitude (radians).
    fn meridian_distance(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// Project geographic coordinates (degrees) to (easting, northing) in metres.
    pub fn project(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();

        // Normalize longitude difference to [-π, π]
        let mut dlon = lon_deg.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let n = self.a / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = phi.tan().powi(2);
        let c = self.ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlon;
        let m = self.meridian_distance(phi);

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a.powi(5) / 120.0);
        let y = self.k0
            * (m + n
                * phi.tan()
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a.powi(6)
                        / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    /// Inverse projection from (easting, northing) in metres to (latitude, longitude) in degrees.
    pub fn unproject(&self, easting: f64, northing: f64) -> (f64, f64) {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let m = (northing - self.false_northing) / self.k0;
        let mu = m / (self.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = phi1.sin();
        let cos1 = phi1.cos();
        let c1 = self.ep2 * cos1 * cos1;
        let t1 = phi1.tan().powi(2);
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = self.a / w.sqrt();
        let r1 = self.a * (1.0 - e2) / w.powf(1.5);
        let d = (easting - self.false_easting) / (n1 * self.k0);

        let phi = phi1
            - (n1 * phi1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * self.ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lambda = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        (phi.to_degrees(), lambda.to_degrees())
    }
}

impl MathTransform2D for TransverseMercator {
    fn transform(&self, lat: f64, lon: f64) -> (f64, f64) {
        if !(-90.0..=90.0).contains(&lat) {
            return (f64::NAN, f64::NAN);
        }
        self.project(lat, lon)
    }

    fn name(&self) -> String {
        match self.zone {
            Some((zone, north)) => {
                format!("UTM zone {}{}", zone, if north { 'N' } else { 'S' })
            }
            None => "Transverse Mercator".to_string(),
        }
    }
}

/// Central meridian of a UTM zone, in degrees.
pub fn central_meridian(zone: u8) -> f64 {
    -183.0 + 6.0 * zone as f64
}
