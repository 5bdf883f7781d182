//! Viewer configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::geo::GeoOrigin;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read viewer config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse viewer config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid viewer config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub origin: GeoOrigin,
    #[serde(default)]
    pub tiles: TileConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Max tracing level for the browser console (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            origin: GeoOrigin::default(),
            tiles: TileConfig::default(),
            camera: CameraConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Terrain tile set. Tiles are named `{base_url}/{prefix}{n}.{extension}`, n = 1..=count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_tile_count")]
    pub count: usize,
    /// Delay between the last tile landing and the ready signal
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Give up on a tile after this many seconds (0 = wait forever)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Frames to wait after decoding before a tile is inserted into the scene
    #[serde(default = "default_insert_delay_frames")]
    pub insert_delay_frames: u8,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            prefix: default_prefix(),
            extension: default_extension(),
            count: default_tile_count(),
            settle_ms: default_settle_ms(),
            timeout_secs: default_timeout_secs(),
            insert_delay_frames: default_insert_delay_frames(),
        }
    }
}

fn default_base_url() -> String {
    "/mountain3D".to_string()
}

fn default_prefix() -> String {
    "9e7dca72aae0_".to_string()
}

fn default_extension() -> String {
    "gltf".to_string()
}

fn default_tile_count() -> usize {
    100
}

fn default_settle_ms() -> u64 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_insert_delay_frames() -> u8 {
    2
}

impl TileConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Camera, orbit limits and flight timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Camera position before auto-framing runs
    #[serde(default = "default_initial_position")]
    pub initial_position: [f32; 3],
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    /// Radians from straight down; keeps the camera above the horizon
    #[serde(default = "default_max_polar_angle")]
    pub max_polar_angle: f32,
    /// Fraction of the remaining distance covered per 60 Hz frame
    #[serde(default = "default_damping")]
    pub damping: f32,
    #[serde(default = "default_flight_duration_ms")]
    pub flight_duration_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov_degrees(),
            near: default_near(),
            far: default_far(),
            initial_position: default_initial_position(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            max_polar_angle: default_max_polar_angle(),
            damping: default_damping(),
            flight_duration_ms: default_flight_duration_ms(),
        }
    }
}

fn default_fov_degrees() -> f32 {
    50.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    2000.0
}

fn default_initial_position() -> [f32; 3] {
    [0.0, 50.0, 100.0]
}

fn default_min_distance() -> f32 {
    10.0
}

fn default_max_distance() -> f32 {
    500.0
}

fn default_max_polar_angle() -> f32 {
    std::f32::consts::FRAC_PI_2 - 0.1
}

fn default_damping() -> f32 {
    0.05
}

fn default_flight_duration_ms() -> u64 {
    1500
}

impl CameraConfig {
    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    pub fn flight_duration(&self) -> Duration {
        Duration::from_millis(self.flight_duration_ms)
    }
}

impl ViewerConfig {
    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded viewer config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_degrees must be in (0, 180), got {}",
                camera.fov_degrees
            )));
        }
        if camera.flight_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "camera.flight_duration_ms must be positive".to_string(),
            ));
        }
        if camera.min_distance <= 0.0 || camera.min_distance > camera.max_distance {
            return Err(ConfigError::Invalid(format!(
                "camera distance range [{}, {}] is empty",
                camera.min_distance, camera.max_distance
            )));
        }
        if camera.near <= 0.0 || camera.near >= camera.far {
            return Err(ConfigError::Invalid(format!(
                "camera clip range [{}, {}] is empty",
                camera.near, camera.far
            )));
        }
        if !(0.0..=1.0).contains(&camera.damping) {
            return Err(ConfigError::Invalid(format!(
                "camera.damping must be in [0, 1], got {}",
                camera.damping
            )));
        }
        if !self.origin.latitude.is_finite()
            || !self.origin.longitude.is_finite()
            || self.origin.latitude.abs() >= 90.0
        {
            return Err(ConfigError::Invalid(format!(
                "origin ({}, {}) is not a usable geodetic origin",
                self.origin.latitude, self.origin.longitude
            )));
        }
        Ok(())
    }

    /// Asset URLs for every terrain tile, in load order
    pub fn tile_urls(&self) -> Vec<String> {
        let tiles = &self.tiles;
        let base = tiles.base_url.trim_end_matches('/');
        (1..=tiles.count)
            .map(|n| format!("{}/{}{}.{}", base, tiles.prefix, n, tiles.extension))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::from_toml("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.tiles.count, 100);
        assert_eq!(config.tiles.settle_delay(), Duration::from_millis(100));
        assert_eq!(config.camera.flight_duration(), Duration::from_millis(1500));
        assert_eq!(config.origin.latitude, 25.102);
    }

    #[test]
    fn test_tile_urls() {
        let config = ViewerConfig::from_toml(
            r#"
[tiles]
base_url = "/terrain/"
prefix = "tile_"
count = 3
extension = "glb"
"#,
        )
        .unwrap();

        assert_eq!(
            config.tile_urls(),
            vec!["/terrain/tile_1.glb", "/terrain/tile_2.glb", "/terrain/tile_3.glb"]
        );
    }

    #[test]
    fn test_default_tile_urls_match_deployment() {
        let urls = ViewerConfig::default().tile_urls();
        assert_eq!(urls.len(), 100);
        assert_eq!(urls[0], "/mountain3D/9e7dca72aae0_1.gltf");
        assert_eq!(urls[99], "/mountain3D/9e7dca72aae0_100.gltf");
    }

    #[test]
    fn test_timeout_zero_disables() {
        let config = ViewerConfig::from_toml("[tiles]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.tiles.timeout(), None);
        assert_eq!(
            TileConfig::default().timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ViewerConfig::from_toml("[camera]\nfov_degrees = 180.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ViewerConfig::from_toml("[camera]\nflight_duration_ms = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ViewerConfig::from_toml("[camera]\nmin_distance = 600.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ViewerConfig::from_toml("[origin]\nlatitude = 90.0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_level = "info"

[origin]
latitude = 24.0
longitude = 120.5

[camera]
fov_degrees = 60.0
"#
        )
        .unwrap();

        let config = ViewerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.origin, GeoOrigin::new(24.0, 120.5));
        assert_eq!(config.camera.fov_degrees, 60.0);
        // Untouched sections keep their defaults
        assert_eq!(config.tiles, TileConfig::default());
    }
}
