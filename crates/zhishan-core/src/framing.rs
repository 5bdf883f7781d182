//! Auto-framing - initial camera pose from the bounds of the loaded terrain

use glam::Vec3;

use crate::orbit::CameraPose;

/// Margin multiplier on the fit distance
pub const FRAMING_MARGIN: f32 = 1.5;

/// Oblique direction (unnormalised) from the scene center to the framing camera
pub const FRAMING_DIRECTION: Vec3 = Vec3::new(0.7, 0.7, 0.7);

/// Axis-aligned bounding box accumulated from mesh geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, point: Vec3) {
        if !point.is_finite() {
            return;
        }
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn largest_dimension(&self) -> f32 {
        self.size().max_element()
    }
}

/// Distance at which a sphere-ish object of `largest_dimension` fills the view
pub fn framing_distance(largest_dimension: f32, fov_radians: f32) -> f32 {
    largest_dimension / (2.0 * (fov_radians / 2.0).tan()) * FRAMING_MARGIN
}

/// Camera pose that frames `bounds`, or None when there is nothing to frame
pub fn frame_bounds(bounds: &Bounds, fov_radians: f32) -> Option<CameraPose> {
    if bounds.is_empty() {
        return None;
    }
    let largest = bounds.largest_dimension();
    if largest.is_nan() || largest <= 0.0 {
        return None;
    }

    let center = bounds.center();
    let distance = framing_distance(largest, fov_radians);
    Some(CameraPose::new(center + FRAMING_DIRECTION * distance, center))
}

/// Runs the framing at most once per viewer lifetime
#[derive(Debug, Clone, Default)]
pub struct AutoFramer {
    framed: Option<CameraPose>,
}

impl AutoFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.framed.is_some()
    }

    /// Pose chosen by the one successful framing pass
    pub fn framed_pose(&self) -> Option<CameraPose> {
        self.framed
    }

    /// Attempt framing. Degenerate bounds leave the framer uninitialized.
    pub fn try_frame(&mut self, bounds: &Bounds, fov_radians: f32) -> Option<CameraPose> {
        if self.framed.is_some() {
            return None;
        }
        let pose = frame_bounds(bounds, fov_radians)?;
        self.framed = Some(pose);
        Some(pose)
    }
}
