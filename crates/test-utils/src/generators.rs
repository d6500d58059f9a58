//! Test data generators for synthetic coordinate variables.
//!
//! These generators create predictable, verifiable coordinate grids and time values
//! that can be used across the test suite. All 2-D grids are in row-major order with
//! the x (column) index varying fastest, matching netCDF storage of a `(y, x)` variable.

use chrono::{Datelike, NaiveDateTime, Timelike};
use projection::{PolarStereographic, TransverseMercator};

/// Longitude and latitude arrays of a curvilinear grid.
#[derive(Debug, Clone)]
pub struct SwathGrid {
    pub width: usize,
    pub height: usize,
    /// Longitudes in degrees, `width * height` values.
    pub lon: Vec<f64>,
    /// Latitudes in degrees, `width * height` values.
    pub lat: Vec<f64>,
}

impl SwathGrid {
    /// Coordinates (lon, lat) of the cell at column `x` and row `y`.
    pub fn at(&self, x: usize, y: usize) -> (f64, f64) {
        let i = y * self.width + x;
        (self.lon[i], self.lat[i])
    }
}

/// Creates a regular 1-D axis.
///
/// # Example
///
/// ```
/// use test_utils::regular_axis;
///
/// assert_eq!(regular_axis(10.0, 0.5, 3), vec![10.0, 10.5, 11.0]);
/// ```
pub fn regular_axis(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Creates a 2-D geographic grid where longitude depends only on the column and
/// latitude only on the row.
pub fn geographic_grid(
    lon0: f64,
    dlon: f64,
    lat0: f64,
    dlat: f64,
    width: usize,
    height: usize,
) -> SwathGrid {
    let mut lon = Vec::with_capacity(width * height);
    let mut lat = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            lon.push(lon0 + dlon * col as f64);
            lat.push(lat0 + dlat * row as f64);
        }
    }
    SwathGrid {
        width,
        height,
        lon,
        lat,
    }
}

/// Creates a swath whose cells are regularly spaced in a UTM zone.
///
/// The grid is exactly linear in projected coordinates, so a UTM linearizer for the
/// same zone fits it better than any affine transform of longitudes and latitudes.
///
/// # Arguments
///
/// * `zone`, `north` - UTM zone and hemisphere
/// * `origin` - (easting, northing) of cell (0, 0) in metres
/// * `step` - (dx, dy) cell size in metres
pub fn utm_swath(
    zone: u8,
    north: bool,
    origin: (f64, f64),
    step: (f64, f64),
    width: usize,
    height: usize,
) -> SwathGrid {
    let tm = TransverseMercator::utm(zone, north);
    projected_swath(origin, step, width, height, |e, n| tm.unproject(e, n))
}

/// Creates a swath whose cells are regularly spaced in UPS coordinates.
pub fn ups_swath(
    north: bool,
    origin: (f64, f64),
    step: (f64, f64),
    width: usize,
    height: usize,
) -> SwathGrid {
    let ps = PolarStereographic::ups(north);
    projected_swath(origin, step, width, height, |e, n| ps.unproject(e, n))
}

fn projected_swath(
    origin: (f64, f64),
    step: (f64, f64),
    width: usize,
    height: usize,
    unproject: impl Fn(f64, f64) -> (f64, f64),
) -> SwathGrid {
    let mut lon = Vec::with_capacity(width * height);
    let mut lat = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let e = origin.0 + step.0 * col as f64;
            let n = origin.1 + step.1 * row as f64;
            let (phi, lambda) = unproject(e, n);
            lon.push(wrap_longitude(lambda));
            lat.push(phi);
        }
    }
    SwathGrid {
        width,
        height,
        lon,
        lat,
    }
}

/// Creates a band of `width` columns spanning `span` degrees of longitude starting at
/// `lon0`, with longitudes wrapped into [-180°, 180°).
///
/// When the band crosses the antimeridian, the longitude values jump by 360°.
pub fn antimeridian_band(
    lon0: f64,
    span: f64,
    lat0: f64,
    dlat: f64,
    width: usize,
    height: usize,
) -> SwathGrid {
    let dlon = span / (width.max(2) - 1) as f64;
    let mut grid = geographic_grid(lon0, dlon, lat0, dlat, width, height);
    for lon in &mut grid.lon {
        *lon = wrap_longitude(*lon);
    }
    grid
}

/// Bring a longitude into [-180°, 180°).
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Encodes a date-time as a `%Y%m%d.%f` number, the fraction being the fraction of day.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use test_utils::pack_date;
///
/// let dt = NaiveDate::from_ymd_opt(2018, 10, 17).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// assert_eq!(pack_date(dt), 20181017.5);
/// ```
pub fn pack_date(dt: NaiveDateTime) -> f64 {
    let day = dt.year() as f64 * 10_000.0 + dt.month() as f64 * 100.0 + dt.day() as f64;
    day + dt.num_seconds_from_midnight() as f64 / 86_400.0
}

/// Encodes calendar fields as concatenated digits, most significant first.
///
/// Each field is given with its digit count, e.g. `[(1, 2), (15, 2)]` for month 1 day 15
/// (`"MMDD"` → `115`). The year is prepended with `year` as the most significant field.
pub fn pack_fields(year: i64, fields: &[(u32, u32)]) -> f64 {
    let mut value = year;
    for (field, digits) in fields {
        value = value * 10_i64.pow(*digits) + *field as i64;
    }
    value as f64
}
