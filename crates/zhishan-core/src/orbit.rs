//! Orbit rig - map-style camera interaction around a pivot
//!
//! Y is up. The camera sits on a sphere around the pivot described by a
//! distance, an azimuth around +Y and a polar angle measured from +Y.
//! Distance and pivot are damped toward goal values; angles apply directly.

use glam::{Vec2, Vec3};

use crate::config::CameraConfig;

/// Camera position plus the point it orbits and looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub pivot: Vec3,
}

impl CameraPose {
    pub fn new(position: Vec3, pivot: Vec3) -> Self {
        Self { position, pivot }
    }

    /// Component-wise linear interpolation of position and pivot
    pub fn lerp(&self, other: &CameraPose, t: f32) -> CameraPose {
        CameraPose {
            position: self.position.lerp(other.position, t),
            pivot: self.pivot.lerp(other.pivot, t),
        }
    }

    pub fn abs_diff_eq(&self, other: &CameraPose, tolerance: f32) -> bool {
        self.position.abs_diff_eq(other.position, tolerance)
            && self.pivot.abs_diff_eq(other.pivot, tolerance)
    }
}

/// The narrow contract the choreographer drives the interaction controller through
pub trait PoseController {
    fn pose(&self) -> CameraPose;
    fn set_pose(&mut self, pose: CameraPose);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitLimits {
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
}

impl Default for OrbitLimits {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl OrbitLimits {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            min_polar: 0.01,
            max_polar: config.max_polar_angle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrbitRig {
    pub pivot: Vec3,
    pub pivot_goal: Vec3,
    pub distance: f32,
    pub distance_goal: f32,
    pub azimuth: f32,
    pub polar: f32,
    pub limits: OrbitLimits,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub damping: f32,
}

impl Default for OrbitRig {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl OrbitRig {
    /// Rig looking at the origin from the configured initial position
    pub fn from_config(config: &CameraConfig) -> Self {
        let mut rig = Self {
            pivot: Vec3::ZERO,
            pivot_goal: Vec3::ZERO,
            distance: config.min_distance,
            distance_goal: config.min_distance,
            azimuth: 0.0,
            polar: std::f32::consts::FRAC_PI_4,
            limits: OrbitLimits::from_config(config),
            sensitivity: 0.005,
            zoom_speed: 0.1,
            damping: config.damping,
        };
        rig.set_pose(CameraPose::new(Vec3::from_array(config.initial_position), Vec3::ZERO));
        rig
    }

    fn offset(&self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        Vec3::new(sin_polar * sin_az, cos_polar, sin_polar * cos_az) * self.distance
    }

    pub fn position(&self) -> Vec3 {
        self.pivot + self.offset()
    }

    /// Drag to orbit; `delta` in pixels
    pub fn rotate(&mut self, delta: Vec2) {
        self.azimuth -= delta.x * self.sensitivity;
        self.polar = (self.polar - delta.y * self.sensitivity)
            .clamp(self.limits.min_polar, self.limits.max_polar);
    }

    /// Drag to pan across the ground plane; `delta` in pixels
    pub fn pan(&mut self, delta: Vec2) {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        // Ground-projected camera axes
        let right = Vec3::new(cos_az, 0.0, -sin_az);
        let forward = Vec3::new(-sin_az, 0.0, -cos_az);
        let pan_speed = self.distance * 0.002;
        self.pivot_goal -= right * delta.x * pan_speed;
        self.pivot_goal += forward * delta.y * pan_speed;
    }

    /// Scroll to zoom; positive `amount` moves closer
    pub fn zoom(&mut self, amount: f32) {
        let zoom_factor = 1.0 - amount * self.zoom_speed * 0.3;
        self.distance_goal = (self.distance_goal * zoom_factor)
            .clamp(self.limits.min_distance, self.limits.max_distance);
    }

    /// Multiply the goal distance directly (pinch gestures)
    pub fn scale_distance(&mut self, factor: f32) {
        self.distance_goal = (self.distance_goal * factor)
            .clamp(self.limits.min_distance, self.limits.max_distance);
    }

    /// Ease distance and pivot toward their goals
    pub fn update(&mut self, dt: f32) {
        let lerp_factor = 1.0 - (-self.damping * 60.0 * dt).exp();
        self.distance += (self.distance_goal - self.distance) * lerp_factor;
        self.pivot += (self.pivot_goal - self.pivot) * lerp_factor;
    }
}

impl PoseController for OrbitRig {
    fn pose(&self) -> CameraPose {
        CameraPose::new(self.position(), self.pivot)
    }

    /// Re-derive the spherical parameters and snap the damped state
    fn set_pose(&mut self, pose: CameraPose) {
        let offset = pose.position - pose.pivot;
        let distance = offset.length();

        self.pivot = pose.pivot;
        self.pivot_goal = pose.pivot;

        if distance > f32::EPSILON {
            self.distance = distance;
            self.polar = (offset.y / distance).clamp(-1.0, 1.0).acos();
            self.azimuth = offset.x.atan2(offset.z);
        }
        self.distance_goal = self.distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_pose_from_config() {
        let rig = OrbitRig::default();
        let pose = rig.pose();
        assert!(pose.position.abs_diff_eq(Vec3::new(0.0, 50.0, 100.0), 1e-3));
        assert_eq!(pose.pivot, Vec3::ZERO);
    }

    #[test]
    fn test_set_pose_is_exact() {
        let mut rig = OrbitRig::default();
        let target = CameraPose::new(Vec3::new(60.0, 96.0, -40.0), Vec3::new(10.0, 16.0, -90.0));
        rig.set_pose(target);
        assert!(rig.pose().abs_diff_eq(&target, 1e-3));

        // Damping has nothing left to do after a snap
        rig.update(0.016);
        assert!(rig.pose().abs_diff_eq(&target, 1e-3));
    }

    #[test]
    fn test_set_pose_degenerate_keeps_angles() {
        let mut rig = OrbitRig::default();
        let azimuth = rig.azimuth;
        rig.set_pose(CameraPose::new(Vec3::ONE, Vec3::ONE));
        assert_eq!(rig.azimuth, azimuth);
        assert_eq!(rig.pivot, Vec3::ONE);
    }

    #[test]
    fn test_rotate_respects_polar_limits() {
        let mut rig = OrbitRig::default();
        rig.rotate(Vec2::new(0.0, -100_000.0));
        assert_eq!(rig.polar, rig.limits.max_polar);
        // Never below the horizon
        assert!(rig.position().y > rig.pivot.y);

        rig.rotate(Vec2::new(0.0, 100_000.0));
        assert_eq!(rig.polar, rig.limits.min_polar);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut rig = OrbitRig::default();
        for _ in 0..200 {
            rig.zoom(10.0);
        }
        assert_eq!(rig.distance_goal, rig.limits.min_distance);

        for _ in 0..200 {
            rig.zoom(-10.0);
        }
        assert_eq!(rig.distance_goal, rig.limits.max_distance);
    }

    #[test]
    fn test_update_converges() {
        let mut rig = OrbitRig::default();
        rig.distance_goal = 200.0;
        rig.pivot_goal = Vec3::new(5.0, 0.0, 5.0);
        for _ in 0..600 {
            rig.update(1.0 / 60.0);
        }
        assert!((rig.distance - 200.0).abs() < 0.01);
        assert!(rig.pivot.abs_diff_eq(Vec3::new(5.0, 0.0, 5.0), 0.01));
    }

    #[test]
    fn test_pan_stays_on_ground_plane() {
        let mut rig = OrbitRig::default();
        rig.pan(Vec2::new(30.0, -12.0));
        assert_eq!(rig.pivot_goal.y, 0.0);
        assert!(rig.pivot_goal.length() > 0.0);
    }
}
