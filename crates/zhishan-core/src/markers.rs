//! Marker appearance and picking math
//!
//! Markers are drawn by the renderer; this module decides how each one looks
//! for a given hover/selection state and which one a pointer ray hits.

use glam::Vec3;

/// Uniform scale applied to every marker group
pub const MARKER_BASE_SCALE: f32 = 0.25;

/// Sphere radius (before group scale) for selected and unselected markers
pub const SELECTED_RADIUS: f32 = 0.375;
pub const MARKER_RADIUS: f32 = 0.2;

/// Selection ring annulus (before group scale), raised above the sphere
pub const RING_INNER_RADIUS: f32 = 3.0;
pub const RING_OUTER_RADIUS: f32 = 8.0;
pub const RING_HEIGHT: f32 = 0.5;
pub const RING_OPACITY: f32 = 0.4;

/// Height of the floating name label above the marker (before group scale)
pub const LABEL_HEIGHT: f32 = 3.0;

/// Picking tolerance as an angle from the pointer ray, in radians
pub const PICK_ANGULAR_TOLERANCE: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkerState {
    pub selected: bool,
    pub hovered: bool,
}

/// Visual parameters for one marker state; colors are sRGB in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub color: [f32; 3],
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub radius: f32,
    pub ring: bool,
}

impl MarkerStyle {
    pub fn for_state(state: MarkerState) -> Self {
        if state.selected {
            Self {
                color: [1.0, 0.0, 0.0],
                emissive: [1.0, 0.0, 0.0],
                emissive_intensity: 0.5,
                radius: SELECTED_RADIUS,
                ring: true,
            }
        } else {
            Self {
                color: if state.hovered { [1.0, 0.4, 0.4] } else { [0.8, 0.0, 0.0] },
                emissive: [0.2, 0.0, 0.0],
                emissive_intensity: 0.2,
                radius: MARKER_RADIUS,
                ring: false,
            }
        }
    }
}

/// Cosmetic vertical bob at `elapsed` seconds
pub fn bob_offset(elapsed: f32) -> f32 {
    (elapsed * 2.0).sin() * 0.1
}

/// Group scale at `elapsed` seconds; the selected marker pulses
pub fn marker_scale(selected: bool, elapsed: f32) -> f32 {
    if selected {
        MARKER_BASE_SCALE * (1.0 + (elapsed * 4.0).sin() * 0.2)
    } else {
        MARKER_BASE_SCALE
    }
}

/// Closest marker hit by a ray.
///
/// A marker counts as hit when the ray passes within its world radius, or
/// within [`PICK_ANGULAR_TOLERANCE`] of it as seen from the ray origin, so
/// small distant markers stay clickable.
pub fn pick_marker<'a, I>(origin: Vec3, direction: Vec3, markers: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, Vec3, f32)>,
{
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return None;
    }

    let mut closest: Option<(f32, &'a str)> = None;
    for (id, center, radius) in markers {
        let to_marker = center - origin;
        let t = to_marker.dot(direction);
        if t < 0.0 {
            continue;
        }

        let closest_point = origin + direction * t;
        let hit_radius = radius.max(t * PICK_ANGULAR_TOLERANCE);
        if (closest_point - center).length_squared() < hit_radius * hit_radius
            && closest.map_or(true, |(best, _)| t < best)
        {
            closest = Some((t, id));
        }
    }
    closest.map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles() {
        let idle = MarkerStyle::for_state(MarkerState::default());
        let hovered = MarkerStyle::for_state(MarkerState { selected: false, hovered: true });
        let selected = MarkerStyle::for_state(MarkerState { selected: true, hovered: true });

        assert_eq!(idle.color, [0.8, 0.0, 0.0]);
        assert_eq!(hovered.color, [1.0, 0.4, 0.4]);
        assert_eq!(selected.color, [1.0, 0.0, 0.0]);

        assert!(!idle.ring && !hovered.ring && selected.ring);
        assert!(selected.radius > idle.radius);
        assert!(selected.emissive_intensity > idle.emissive_intensity);
    }

    #[test]
    fn test_bob_and_pulse_bounds() {
        for i in 0..100 {
            let t = i as f32 * 0.1;
            assert!(bob_offset(t).abs() <= 0.1 + 1e-6);
            assert_eq!(marker_scale(false, t), MARKER_BASE_SCALE);
            let pulse = marker_scale(true, t);
            assert!(pulse >= MARKER_BASE_SCALE * 0.8 - 1e-6);
            assert!(pulse <= MARKER_BASE_SCALE * 1.2 + 1e-6);
        }
        // Period of pi seconds
        assert!((bob_offset(1.0) - bob_offset(1.0 + std::f32::consts::PI)).abs() < 1e-5);
    }

    #[test]
    fn test_pick_closest_along_ray() {
        let markers = [
            ("far", Vec3::new(0.0, 0.0, -100.0), 0.05),
            ("near", Vec3::new(0.0, 0.0, -10.0), 0.05),
            ("behind", Vec3::new(0.0, 0.0, 10.0), 0.05),
        ];
        let hit = pick_marker(Vec3::ZERO, Vec3::NEG_Z, markers.iter().copied());
        assert_eq!(hit, Some("near"));
    }

    #[test]
    fn test_pick_tolerance_grows_with_distance() {
        // 1.5 units off-axis at 100 units away is inside the 0.02 rad cone
        let markers = [("a", Vec3::new(1.5, 0.0, -100.0), 0.05)];
        assert_eq!(
            pick_marker(Vec3::ZERO, Vec3::NEG_Z, markers.iter().copied()),
            Some("a")
        );

        // The same offset at 10 units is a miss
        let markers = [("a", Vec3::new(1.5, 0.0, -10.0), 0.05)];
        assert_eq!(pick_marker(Vec3::ZERO, Vec3::NEG_Z, markers.iter().copied()), None);
    }

    #[test]
    fn test_pick_zero_direction() {
        let markers = [("a", Vec3::ZERO, 1.0)];
        assert_eq!(pick_marker(Vec3::ONE, Vec3::ZERO, markers.iter().copied()), None);
    }
}
