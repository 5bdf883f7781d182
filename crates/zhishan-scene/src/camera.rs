//! Camera controls, orbit navigation and scripted flights

use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use zhishan_core::{AutoFramer, Choreographer, FlightDestination, OrbitRig, PoseController};

use crate::types::*;

/// Plugin for the main camera, its orbit controls and flights
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<FlightFinished>()
            .add_message::<RecenterRequested>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (
                    release_queued_flight,
                    follow_selection,
                    handle_recenter,
                    update_orbit,
                    advance_flight,
                    apply_camera_pose,
                )
                    .chain()
                    .in_set(ViewerSet::Camera),
            );
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// The user-facing orbit controller
#[derive(Resource, Debug, Clone, Default, Deref, DerefMut)]
pub struct OrbitCamera(pub OrbitRig);

/// Flight state machine plus the one-shot framing result
#[derive(Resource, Debug, Clone)]
pub struct CameraDirector {
    pub choreographer: Choreographer,
    pub framer: AutoFramer,
}

impl CameraDirector {
    pub fn new(settings: &ViewerSettings) -> Self {
        Self {
            choreographer: Choreographer::new(settings.camera.flight_duration()),
            framer: AutoFramer::new(),
        }
    }
}

fn setup_camera(mut commands: Commands, settings: Res<ViewerSettings>) {
    let camera = &settings.camera;
    let rig = OrbitRig::from_config(camera);
    let pose = rig.pose();

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: camera.fov_radians(),
            near: camera.near,
            far: camera.far,
            ..default()
        }),
        Transform::from_translation(pose.position).looking_at(pose.pivot, Vec3::Y),
        MainCamera,
    ));

    commands.insert_resource(OrbitCamera(rig));
    commands.insert_resource(CameraDirector::new(&settings));

    // Soft fill so terrain in shadow keeps its texture
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 900.0,
        ..default()
    });

    // Key light
    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(10.0, 20.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Back fill
    commands.spawn((
        DirectionalLight {
            illuminance: 2000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(-5.0, 10.0, -5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Start the flight that was requested while tiles were still loading
fn release_queued_flight(
    mut ready: MessageReader<AllTilesLoaded>,
    mut director: ResMut<CameraDirector>,
    orbit: Res<OrbitCamera>,
    time: Res<Time>,
) {
    if ready.read().count() == 0 {
        return;
    }
    director
        .choreographer
        .mark_scene_ready(&orbit.0, time.elapsed());
}

/// Fly to the selected site; deselecting abandons any flight in progress
fn follow_selection(
    selected: Res<SelectedSite>,
    catalog: Res<Catalog>,
    settings: Res<ViewerSettings>,
    mut director: ResMut<CameraDirector>,
    orbit: Res<OrbitCamera>,
    time: Res<Time>,
) {
    if !selected.is_changed() {
        return;
    }

    let Some(id) = selected.0.as_deref() else {
        director.choreographer.cancel();
        return;
    };
    let Some(site) = catalog.get(id) else {
        warn!("Selected site '{}' is not in the catalog", id);
        return;
    };

    let target = settings.site_position(site);
    director.choreographer.fly_to(
        FlightDestination::site(&site.id, target),
        &orbit.0,
        time.elapsed(),
    );
}

fn handle_recenter(
    mut requests: MessageReader<RecenterRequested>,
    selected: Res<SelectedSite>,
    catalog: Res<Catalog>,
    settings: Res<ViewerSettings>,
    mut director: ResMut<CameraDirector>,
    orbit: Res<OrbitCamera>,
    time: Res<Time>,
) {
    if requests.read().count() == 0 {
        return;
    }

    let destination = match selected.0.as_deref().and_then(|id| catalog.get(id)) {
        Some(site) => FlightDestination::site(&site.id, settings.site_position(site)),
        None => FlightDestination::overview(director.framer.framed_pose(), Vec3::ZERO),
    };
    debug!("Recentering toward {:?}", destination.site_id);
    director
        .choreographer
        .fly_to(destination, &orbit.0, time.elapsed());
}

/// User orbit, pan and zoom. Ignored while a flight owns the camera.
fn update_orbit(
    mut orbit: ResMut<OrbitCamera>,
    director: Res<CameraDirector>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }
    let mut total_scroll = 0.0;
    for scroll in mouse_wheel.read() {
        total_scroll += match scroll.unit {
            MouseScrollUnit::Line => scroll.y,
            MouseScrollUnit::Pixel => scroll.y / 100.0,
        };
    }

    if director.choreographer.is_animating() {
        return;
    }

    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);

    if !egui_wants_pointer {
        // Map-style: left drag pans, right drag orbits
        if mouse_button.pressed(MouseButton::Left) {
            orbit.pan(total_motion);
        }
        if mouse_button.pressed(MouseButton::Right) {
            orbit.rotate(total_motion);
        }
        if total_scroll != 0.0 {
            orbit.zoom(total_scroll);
        }

        // One finger pans
        if touch_input.iter().count() == 1 {
            for touch in touch_input.iter() {
                let delta = touch.delta();
                if delta != Vec2::ZERO {
                    orbit.pan(delta);
                }
            }
        }

        // Two fingers: pinch to zoom, drag together to orbit
        if touch_input.iter().count() == 2 {
            let touches: Vec<_> = touch_input.iter().collect();
            if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
                let curr_dist = t1.position().distance(t2.position());
                let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
                orbit.scale_distance(prev_dist / curr_dist.max(1.0));
                orbit.rotate((t1.delta() + t2.delta()) * 0.5);
            }
        }
    }

    orbit.update(time.delta_secs());
}

fn advance_flight(
    mut director: ResMut<CameraDirector>,
    mut orbit: ResMut<OrbitCamera>,
    mut finished: MessageWriter<FlightFinished>,
    time: Res<Time>,
) {
    if let Some(done) = director.choreographer.tick(&mut orbit.0, time.elapsed()) {
        debug!("Flight finished at {:?}", done.site_id);
        finished.write(FlightFinished {
            site_id: done.site_id,
        });
    }
}

fn apply_camera_pose(
    orbit: Res<OrbitCamera>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    if !orbit.is_changed() {
        return;
    }
    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };
    let pose = orbit.pose();
    transform.translation = pose.position;
    transform.look_at(pose.pivot, Vec3::Y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::time::TimeUpdateStrategy;
    use std::time::Duration;
    use zhishan_core::{Site, SiteCatalog, ViewerConfig};

    fn site(id: &str, latitude: f64, longitude: f64) -> Site {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": id,
            "latitude": latitude,
            "longitude": longitude,
        }))
        .unwrap()
    }

    #[derive(Resource, Default)]
    struct Finished(Vec<Option<String>>);

    fn record(mut reader: MessageReader<FlightFinished>, mut finished: ResMut<Finished>) {
        finished.0.extend(reader.read().map(|f| f.site_id.clone()));
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .insert_resource(ViewerSettings(ViewerConfig::default()))
            .insert_resource(Catalog(
                SiteCatalog::new(vec![site("a", 25.103, 121.524)]).unwrap(),
            ))
            .init_resource::<SelectedSite>()
            .init_resource::<Finished>()
            .add_message::<AllTilesLoaded>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (
                    release_queued_flight,
                    follow_selection,
                    handle_recenter,
                    advance_flight,
                    apply_camera_pose,
                    record,
                )
                    .chain(),
            )
            .add_message::<FlightFinished>()
            .add_message::<RecenterRequested>();
        app.update();
        app
    }

    #[test]
    fn test_selection_waits_for_ready() {
        let mut app = test_app();
        let start = app.world().resource::<OrbitCamera>().pose();

        app.world_mut().resource_mut::<SelectedSite>().0 = Some("a".into());
        for _ in 0..5 {
            app.update();
        }
        let director = app.world().resource::<CameraDirector>();
        assert!(!director.choreographer.is_animating());
        assert!(director.choreographer.queued().is_some());
        assert_eq!(app.world().resource::<OrbitCamera>().pose(), start);

        app.world_mut()
            .write_message(AllTilesLoaded { loaded: 1, skipped: 0 });
        // 1.5 s flight at 100 ms per frame
        for _ in 0..25 {
            app.update();
        }

        let finished = &app.world().resource::<Finished>().0;
        assert_eq!(finished, &vec![Some("a".to_string())]);

        let settings = app.world().resource::<ViewerSettings>().clone();
        let catalog = app.world().resource::<Catalog>().clone();
        let target = settings.site_position(catalog.get("a").unwrap());
        let pose = app.world().resource::<OrbitCamera>().pose();
        assert!(pose.pivot.abs_diff_eq(target, 1e-3));

        let mut cameras = app
            .world_mut()
            .query_filtered::<&Transform, With<MainCamera>>();
        let transform = cameras.single(app.world()).unwrap();
        assert!(transform.translation.abs_diff_eq(pose.position, 1e-3));
    }

    #[test]
    fn test_deselect_cancels_flight() {
        let mut app = test_app();
        app.world_mut()
            .write_message(AllTilesLoaded { loaded: 1, skipped: 0 });
        app.update();

        app.world_mut().resource_mut::<SelectedSite>().0 = Some("a".into());
        app.update();
        app.update();
        assert!(app
            .world()
            .resource::<CameraDirector>()
            .choreographer
            .is_animating());

        app.world_mut().resource_mut::<SelectedSite>().0 = None;
        app.update();
        let paused = app.world().resource::<OrbitCamera>().pose();
        assert!(!app
            .world()
            .resource::<CameraDirector>()
            .choreographer
            .is_animating());

        for _ in 0..20 {
            app.update();
        }
        assert_eq!(app.world().resource::<OrbitCamera>().pose(), paused);
        assert!(app.world().resource::<Finished>().0.is_empty());
    }

    #[test]
    fn test_recenter_without_selection_uses_overview() {
        let mut app = test_app();
        app.world_mut()
            .write_message(AllTilesLoaded { loaded: 1, skipped: 0 });
        app.update();

        app.world_mut().write_message(RecenterRequested);
        for _ in 0..25 {
            app.update();
        }
        assert_eq!(app.world().resource::<Finished>().0, vec![None]);
        assert_eq!(app.world().resource::<OrbitCamera>().pose().pivot, Vec3::ZERO);
    }
}
