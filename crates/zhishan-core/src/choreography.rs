//! Camera choreography - eased, interruptible flights between camera poses
//!
//! Two phases: `Idle`, where the orbit rig belongs to the user, and
//! `Animating`, where every tick writes an interpolated pose through the
//! [`PoseController`]. A new destination always starts from the controller's
//! current pose, so an interrupted flight continues from wherever the camera
//! is rather than jumping back to the old start.
//!
//! Flights requested before the scene is ready are queued and start when
//! [`Choreographer::mark_scene_ready`] is called.

use glam::Vec3;
use std::time::Duration;
use tracing::debug;

use crate::framing::FRAMING_DIRECTION;
use crate::orbit::{CameraPose, PoseController};

/// Offset direction from a flight target to the camera
pub const FLIGHT_DIRECTION: Vec3 = Vec3::new(0.5, 0.8, 0.5);

/// Smallest offset distance used when flying to a target
pub const MIN_FLIGHT_DISTANCE: f32 = 20.0;

/// Cubic ease-in-out on [0, 1]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Camera pose for looking at `target`. Points further from the origin are
/// viewed from further away.
pub fn flight_pose(target: Vec3) -> CameraPose {
    let distance = (target.x.abs() * 2.0)
        .max(target.z.abs() * 2.0)
        .max(MIN_FLIGHT_DISTANCE);
    CameraPose::new(target + FLIGHT_DIRECTION * distance, target)
}

/// Where a flight ends, and which site (if any) it is for
#[derive(Debug, Clone, PartialEq)]
pub struct FlightDestination {
    pub site_id: Option<String>,
    pub pose: CameraPose,
}

impl FlightDestination {
    pub fn site(site_id: impl Into<String>, position: Vec3) -> Self {
        Self {
            site_id: Some(site_id.into()),
            pose: flight_pose(position),
        }
    }

    /// Whole-scene view: the auto-framed pose when available, otherwise a
    /// flight pose onto `scene_center`
    pub fn overview(framed: Option<CameraPose>, scene_center: Vec3) -> Self {
        let pose = framed.unwrap_or_else(|| {
            let offset = FRAMING_DIRECTION * MIN_FLIGHT_DISTANCE;
            CameraPose::new(scene_center + offset, scene_center)
        });
        Self { site_id: None, pose }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    pub start: CameraPose,
    pub destination: FlightDestination,
    pub started_at: Duration,
}

impl Flight {
    /// Linear progress in [0, 1]
    pub fn progress(&self, now: Duration, duration: Duration) -> f32 {
        if duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.started_at);
        (elapsed.as_secs_f32() / duration.as_secs_f32()).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Animating(Flight),
}

/// Emitted when a flight reaches its destination
#[derive(Debug, Clone, PartialEq)]
pub struct FlightCompleted {
    pub site_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Choreographer {
    phase: Phase,
    duration: Duration,
    scene_ready: bool,
    queued: Option<FlightDestination>,
}

impl Choreographer {
    pub fn new(duration: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            duration,
            scene_ready: false,
            queued: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Animating(_))
    }

    pub fn is_scene_ready(&self) -> bool {
        self.scene_ready
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn queued(&self) -> Option<&FlightDestination> {
        self.queued.as_ref()
    }

    /// Start (or restart) a flight. Queued until the scene is ready.
    pub fn fly_to<C: PoseController + ?Sized>(
        &mut self,
        destination: FlightDestination,
        controller: &C,
        now: Duration,
    ) {
        if !self.scene_ready {
            debug!("Scene not ready, queueing flight to {:?}", destination.site_id);
            self.queued = Some(destination);
            return;
        }

        let start = controller.pose();
        if self.is_animating() {
            debug!("Flight superseded, restarting toward {:?}", destination.site_id);
        } else {
            debug!("Flight starting toward {:?}", destination.site_id);
        }
        self.phase = Phase::Animating(Flight {
            start,
            destination,
            started_at: now,
        });
    }

    /// Release any flight queued before readiness
    pub fn mark_scene_ready<C: PoseController + ?Sized>(&mut self, controller: &C, now: Duration) {
        if self.scene_ready {
            return;
        }
        self.scene_ready = true;
        if let Some(destination) = self.queued.take() {
            self.fly_to(destination, controller, now);
        }
    }

    /// Abandon the current flight and anything queued; the camera stays put
    pub fn cancel(&mut self) {
        if self.is_animating() {
            debug!("Flight cancelled");
        }
        self.phase = Phase::Idle;
        self.queued = None;
    }

    /// Advance the current flight, writing the interpolated pose
    pub fn tick<C: PoseController + ?Sized>(
        &mut self,
        controller: &mut C,
        now: Duration,
    ) -> Option<FlightCompleted> {
        let Phase::Animating(flight) = &self.phase else {
            return None;
        };

        let progress = flight.progress(now, self.duration);
        let eased = ease_in_out_cubic(progress);
        controller.set_pose(flight.start.lerp(&flight.destination.pose, eased));

        if progress < 1.0 {
            return None;
        }

        let site_id = flight.destination.site_id.clone();
        self.phase = Phase::Idle;
        debug!("Flight finished at {:?}", site_id);
        Some(FlightCompleted { site_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::OrbitRig;

    const DURATION: Duration = Duration::from_millis(1500);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Controller that stores the pose verbatim
    struct FixedController(CameraPose);

    impl PoseController for FixedController {
        fn pose(&self) -> CameraPose {
            self.0
        }
        fn set_pose(&mut self, pose: CameraPose) {
            self.0 = pose;
        }
    }

    fn ready_choreographer(controller: &FixedController) -> Choreographer {
        let mut c = Choreographer::new(DURATION);
        c.mark_scene_ready(controller, Duration::ZERO);
        c
    }

    #[test]
    fn test_ease_boundaries() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert_eq!(ease_in_out_cubic(0.5), 0.5);
        assert!((ease_in_out_cubic(0.25) - 0.0625).abs() < 1e-6);
        assert!((ease_in_out_cubic(0.75) - 0.9375).abs() < 1e-6);
    }

    #[test]
    fn test_ease_monotonic() {
        let mut previous = ease_in_out_cubic(0.0);
        for i in 1..=1000 {
            let value = ease_in_out_cubic(i as f32 / 1000.0);
            assert!(value >= previous, "ease decreased at step {}", i);
            previous = value;
        }
    }

    #[test]
    fn test_flight_pose_distance_floor() {
        let near = flight_pose(Vec3::new(1.0, 5.0, -2.0));
        assert_eq!(near.pivot, Vec3::new(1.0, 5.0, -2.0));
        assert!(near
            .position
            .abs_diff_eq(Vec3::new(1.0 + 10.0, 5.0 + 16.0, -2.0 + 10.0), 1e-4));

        // Distant points are framed from further away
        let far = flight_pose(Vec3::new(100.0, 0.0, -30.0));
        assert!(far
            .position
            .abs_diff_eq(Vec3::new(200.0, 160.0, 70.0), 1e-3));
    }

    #[test]
    fn test_flight_terminates_at_target() {
        let mut controller = FixedController(CameraPose::new(Vec3::new(0.0, 50.0, 100.0), Vec3::ZERO));
        let mut choreographer = ready_choreographer(&controller);
        let destination = FlightDestination::site("2", Vec3::new(100.5, 5.0, -111.0));
        let target = destination.pose;

        choreographer.fly_to(destination, &controller, ms(1000));
        assert!(choreographer.is_animating());

        assert_eq!(choreographer.tick(&mut controller, ms(1750)), None);
        assert!(choreographer.is_animating());

        let done = choreographer.tick(&mut controller, ms(2501)).unwrap();
        assert_eq!(done.site_id.as_deref(), Some("2"));
        assert_eq!(choreographer.phase(), &Phase::Idle);
        assert!(controller.0.abs_diff_eq(&target, 1e-4));

        // Idle ticks leave the camera alone
        controller.0 = CameraPose::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(choreographer.tick(&mut controller, ms(3000)), None);
        assert_eq!(controller.0.position, Vec3::ONE);
    }

    #[test]
    fn test_midpoint_is_halfway() {
        let start = CameraPose::new(Vec3::ZERO, Vec3::ZERO);
        let mut controller = FixedController(start);
        let mut choreographer = ready_choreographer(&controller);
        let destination = FlightDestination::site("a", Vec3::new(10.0, 0.0, 0.0));
        let target = destination.pose;

        choreographer.fly_to(destination, &controller, Duration::ZERO);
        choreographer.tick(&mut controller, ms(750));
        assert!(controller.0.abs_diff_eq(&start.lerp(&target, 0.5), 1e-4));
    }

    #[test]
    fn test_retarget_restarts_from_current_pose() {
        let original_start = CameraPose::new(Vec3::new(0.0, 50.0, 100.0), Vec3::ZERO);
        let mut controller = FixedController(original_start);
        let mut choreographer = ready_choreographer(&controller);

        choreographer.fly_to(
            FlightDestination::site("a", Vec3::new(80.0, 0.0, 0.0)),
            &controller,
            Duration::ZERO,
        );
        choreographer.tick(&mut controller, ms(600));
        let partial = controller.0;
        assert!(!partial.abs_diff_eq(&original_start, 1e-3));

        choreographer.fly_to(
            FlightDestination::site("b", Vec3::new(-40.0, 0.0, 60.0)),
            &controller,
            ms(600),
        );
        let Phase::Animating(flight) = choreographer.phase() else {
            panic!("expected a flight in progress");
        };
        assert_eq!(flight.start, partial);
        assert_eq!(flight.started_at, ms(600));

        // First tick of the new flight does not teleport
        choreographer.tick(&mut controller, ms(600));
        assert!(controller.0.abs_diff_eq(&partial, 1e-4));
    }

    #[test]
    fn test_queued_until_ready() {
        let mut controller = FixedController(CameraPose::new(Vec3::Y * 10.0, Vec3::ZERO));
        let mut choreographer = Choreographer::new(DURATION);

        choreographer.fly_to(
            FlightDestination::site("q", Vec3::new(5.0, 0.0, 5.0)),
            &controller,
            ms(10),
        );
        assert!(!choreographer.is_animating());
        assert!(choreographer.queued().is_some());
        assert_eq!(choreographer.tick(&mut controller, ms(20)), None);

        choreographer.mark_scene_ready(&controller, ms(500));
        assert!(choreographer.queued().is_none());
        let Phase::Animating(flight) = choreographer.phase() else {
            panic!("queued flight did not start");
        };
        assert_eq!(flight.started_at, ms(500));
    }

    #[test]
    fn test_cancel_keeps_partial_pose() {
        let mut controller = FixedController(CameraPose::new(Vec3::Z * 30.0, Vec3::ZERO));
        let mut choreographer = ready_choreographer(&controller);
        choreographer.fly_to(
            FlightDestination::site("a", Vec3::new(50.0, 0.0, 0.0)),
            &controller,
            Duration::ZERO,
        );
        choreographer.tick(&mut controller, ms(300));
        let partial = controller.0;

        choreographer.cancel();
        assert_eq!(choreographer.phase(), &Phase::Idle);
        assert_eq!(choreographer.tick(&mut controller, ms(2000)), None);
        assert_eq!(controller.0, partial);
    }

    #[test]
    fn test_overview_destination() {
        let framed = CameraPose::new(Vec3::splat(70.0), Vec3::ZERO);
        assert_eq!(FlightDestination::overview(Some(framed), Vec3::ONE).pose, framed);

        let fallback = FlightDestination::overview(None, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(fallback.site_id, None);
        assert_eq!(fallback.pose.pivot, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_drives_orbit_rig() {
        let mut rig = OrbitRig::default();
        let mut choreographer = Choreographer::new(DURATION);
        choreographer.mark_scene_ready(&rig, Duration::ZERO);

        let destination = FlightDestination::site("1", Vec3::new(0.0, 50.0, 0.0));
        let target = destination.pose;
        choreographer.fly_to(destination, &rig, Duration::ZERO);

        let mut t = 0;
        while choreographer.tick(&mut rig, ms(t)).is_none() {
            t += 16;
        }
        assert!(t >= 1500);
        assert!(rig.pose().abs_diff_eq(&target, 1e-2));
    }
}
