//! Geodetic projection into the viewer's local frame
//!
//! The terrain model is authored around a fixed geodetic origin. Points are
//! placed on a local tangent plane using a small-angle equirectangular
//! approximation, which holds to a few meters over the few hundred meters
//! the viewer covers.
//!
//! Local frame is Y-up: +X east, +Y up, -Z north.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Meters per degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// The (latitude, longitude) treated as the local coordinate system's zero point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoOrigin {
    #[serde(default = "default_origin_latitude")]
    pub latitude: f64,
    #[serde(default = "default_origin_longitude")]
    pub longitude: f64,
}

fn default_origin_latitude() -> f64 {
    25.102
}

fn default_origin_longitude() -> f64 {
    121.523
}

impl Default for GeoOrigin {
    fn default() -> Self {
        Self {
            latitude: default_origin_latitude(),
            longitude: default_origin_longitude(),
        }
    }
}

impl GeoOrigin {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Meters per degree of longitude at this origin's latitude
    pub fn meters_per_degree_lon(&self) -> f64 {
        METERS_PER_DEGREE * self.latitude.to_radians().cos()
    }

    /// Project a geodetic point relative to this origin
    pub fn project(&self, latitude: f64, longitude: f64, height: f64) -> DVec3 {
        project(latitude, longitude, height, self.latitude, self.longitude)
    }
}

/// Map (latitude, longitude, height) to local coordinates around an origin.
///
/// Longitude delta goes to X, negated latitude delta to Z and height to Y.
pub fn project(
    latitude: f64,
    longitude: f64,
    height: f64,
    origin_latitude: f64,
    origin_longitude: f64,
) -> DVec3 {
    let delta_lat = latitude - origin_latitude;
    let delta_lon = longitude - origin_longitude;
    let meters_per_degree_lon = METERS_PER_DEGREE * origin_latitude.to_radians().cos();

    DVec3::new(
        delta_lon * meters_per_degree_lon,
        height,
        -delta_lat * METERS_PER_DEGREE,
    )
}
