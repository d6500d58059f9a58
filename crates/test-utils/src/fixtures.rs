//! Common attribute fixtures for CF coordinate variables.
//!
//! Each fixture is a list of `(attribute name, text value)` pairs as they appear in
//! typical netCDF files.

/// Attributes of a CF longitude coordinate variable.
pub const LONGITUDE: &[(&str, &str)] = &[
    ("standard_name", "longitude"),
    ("long_name", "longitude"),
    ("units", "degrees_east"),
];

/// Attributes of a CF latitude coordinate variable.
pub const LATITUDE: &[(&str, &str)] = &[
    ("standard_name", "latitude"),
    ("long_name", "latitude"),
    ("units", "degrees_north"),
];

/// Attributes of a CF time coordinate variable.
pub const TIME: &[(&str, &str)] = &[
    ("standard_name", "time"),
    ("units", "days since 1970-01-01 00:00:00"),
];

/// Attributes of a pressure level coordinate variable.
pub const PRESSURE: &[(&str, &str)] = &[("long_name", "pressure level"), ("units", "hPa")];

/// Attributes of a projected x coordinate variable.
pub const PROJECTION_X: &[(&str, &str)] = &[
    ("standard_name", "projection_x_coordinate"),
    ("units", "m"),
];

/// Attributes of a projected y coordinate variable.
pub const PROJECTION_Y: &[(&str, &str)] = &[
    ("standard_name", "projection_y_coordinate"),
    ("units", "m"),
];

/// Attributes of a time variable encoded as packed `YYYYMMDD.f` digits.
pub const PACKED_TIME: &[(&str, &str)] = &[
    ("standard_name", "time"),
    ("units", "day as %Y%m%d.%f"),
];

/// Names accepted for each kind of axis, as found in files from various producers.
pub mod names {
    pub const LONGITUDE: [&str; 3] = ["longitude", "lon", "long"];
    pub const LATITUDE: [&str; 2] = ["latitude", "lat"];
    pub const HEIGHT: [&str; 3] = ["height", "altitude", "elevation"];
    pub const DEPTH: [&str; 1] = ["depth"];
    pub const TIME: [&str; 3] = ["time", "runtime", "reftime"];
}
