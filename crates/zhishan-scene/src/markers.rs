//! Site markers - one pickable, animated marker per catalog site

use bevy::prelude::*;
use zhishan_core::markers::{
    bob_offset, marker_scale, pick_marker, MarkerState, MarkerStyle, MARKER_BASE_SCALE,
    RING_HEIGHT, RING_INNER_RADIUS, RING_OPACITY, RING_OUTER_RADIUS,
};

use crate::camera::MainCamera;
use crate::types::*;

/// Pointer travel (pixels) past which a press counts as a drag, not a click
const DRAG_THRESHOLD: f32 = 6.0;

/// Plugin that spawns, animates and picks site markers
pub struct MarkersPlugin;

impl Plugin for MarkersPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HoveredSite>()
            .init_resource::<PointerPress>()
            .add_message::<SiteClicked>()
            .add_systems(Startup, setup_marker_assets)
            .add_systems(
                Update,
                (sync_markers, animate_markers, pick_markers, style_markers)
                    .chain()
                    .in_set(ViewerSet::Markers),
            );
    }
}

/// Root of one site's marker
#[derive(Component, Debug, Clone)]
pub struct SiteMarker {
    pub site_id: String,
    /// Projected site position, before the bob
    pub anchor: Vec3,
}

/// The marker's sphere
#[derive(Component)]
pub struct MarkerSphere;

/// Ring shown under the selected marker
#[derive(Component)]
pub struct MarkerRing;

/// Shared meshes and per-state materials for every marker
#[derive(Resource)]
pub struct MarkerAssets {
    sphere: Handle<Mesh>,
    ring: Handle<Mesh>,
    idle: Handle<StandardMaterial>,
    hovered: Handle<StandardMaterial>,
    selected: Handle<StandardMaterial>,
    ring_material: Handle<StandardMaterial>,
}

impl MarkerAssets {
    fn material(&self, state: MarkerState) -> &Handle<StandardMaterial> {
        match (state.selected, state.hovered) {
            (true, _) => &self.selected,
            (false, true) => &self.hovered,
            (false, false) => &self.idle,
        }
    }
}

/// Press start for click-versus-drag detection (mouse or single touch)
#[derive(Resource, Default)]
pub struct PointerPress {
    start_position: Option<Vec2>,
    is_dragging: bool,
}

fn style_material(style: &MarkerStyle) -> StandardMaterial {
    let [r, g, b] = style.color;
    let [er, eg, eb] = style.emissive;
    StandardMaterial {
        base_color: Color::srgb(r, g, b),
        emissive: Color::srgb(er, eg, eb).to_linear() * style.emissive_intensity,
        perceptual_roughness: 0.6,
        ..default()
    }
}

fn setup_marker_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let style = |selected, hovered| MarkerStyle::for_state(MarkerState { selected, hovered });

    commands.insert_resource(MarkerAssets {
        // Unit sphere, scaled per state
        sphere: meshes.add(Sphere::new(1.0).mesh().uv(32, 16)),
        ring: meshes.add(Annulus::new(RING_INNER_RADIUS, RING_OUTER_RADIUS)),
        idle: materials.add(style_material(&style(false, false))),
        hovered: materials.add(style_material(&style(false, true))),
        selected: materials.add(style_material(&style(true, false))),
        ring_material: materials.add(StandardMaterial {
            base_color: Color::srgba(1.0, 0.0, 0.0, RING_OPACITY),
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            double_sided: true,
            cull_mode: None,
            ..default()
        }),
    });
}

/// Respawn all markers whenever the catalog or the origin changes
fn sync_markers(
    mut commands: Commands,
    catalog: Res<Catalog>,
    settings: Res<ViewerSettings>,
    assets: Option<Res<MarkerAssets>>,
    existing: Query<Entity, With<SiteMarker>>,
) {
    let Some(assets) = assets else {
        return;
    };
    if !catalog.is_changed() && !settings.is_changed() && !assets.is_added() {
        return;
    }

    for entity in &existing {
        commands.entity(entity).despawn();
    }

    let idle = MarkerStyle::for_state(MarkerState::default());
    for site in catalog.iter() {
        let anchor = settings.site_position(site);
        commands
            .spawn((
                Name::new(format!("Marker {}", site.id)),
                SiteMarker {
                    site_id: site.id.clone(),
                    anchor,
                },
                Transform::from_translation(anchor).with_scale(Vec3::splat(MARKER_BASE_SCALE)),
                Visibility::default(),
            ))
            .with_children(|parent| {
                parent.spawn((
                    MarkerSphere,
                    Mesh3d(assets.sphere.clone()),
                    MeshMaterial3d(assets.idle.clone()),
                    Transform::from_scale(Vec3::splat(idle.radius)),
                ));
                parent.spawn((
                    MarkerRing,
                    Mesh3d(assets.ring.clone()),
                    MeshMaterial3d(assets.ring_material.clone()),
                    Transform::from_xyz(0.0, RING_HEIGHT, 0.0)
                        .with_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
                    Visibility::Hidden,
                ));
            });
    }
    info!("Placed {} site markers", catalog.len());
}

/// Bob every marker; pulse the selected one
fn animate_markers(
    time: Res<Time>,
    selected: Res<SelectedSite>,
    mut markers: Query<(&SiteMarker, &mut Transform)>,
) {
    let t = time.elapsed_secs();
    for (marker, mut transform) in &mut markers {
        let is_selected = selected.0.as_deref() == Some(marker.site_id.as_str());
        transform.translation = marker.anchor + Vec3::Y * bob_offset(t);
        transform.scale = Vec3::splat(marker_scale(is_selected, t));
    }
}

/// Hover tracking plus click/tap detection against the markers
fn pick_markers(
    mut hovered: ResMut<HoveredSite>,
    mut press: ResMut<PointerPress>,
    mut clicked: MessageWriter<SiteClicked>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    markers: Query<(&SiteMarker, &GlobalTransform)>,
    selected: Res<SelectedSite>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    mut contexts: bevy_egui::EguiContexts,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);
    let Ok(window) = windows.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    let hit_at = |pos: Vec2| -> Option<String> {
        let ray = camera.viewport_to_world(camera_transform, pos).ok()?;
        let candidates = markers.iter().map(|(marker, transform)| {
            let is_selected = selected.0.as_deref() == Some(marker.site_id.as_str());
            let style = MarkerStyle::for_state(MarkerState {
                selected: is_selected,
                hovered: false,
            });
            let scale = transform.compute_transform().scale.x;
            (marker.site_id.as_str(), transform.translation(), style.radius * scale)
        });
        pick_marker(ray.origin, *ray.direction, candidates).map(str::to_string)
    };

    let cursor = window.cursor_position();
    let mut release_pos: Option<Vec2> = None;

    // Mouse press and release
    if mouse_button.just_pressed(MouseButton::Left) && !egui_wants_pointer {
        press.start_position = cursor;
        press.is_dragging = false;
    }
    if let (Some(start), Some(pos)) = (press.start_position, cursor) {
        if pos.distance(start) > DRAG_THRESHOLD {
            press.is_dragging = true;
        }
    }
    if mouse_button.just_released(MouseButton::Left) {
        if !press.is_dragging {
            release_pos = press.start_position;
        }
        press.start_position = None;
        press.is_dragging = false;
    }

    // Single-touch tap
    if let Some(touch) = touch_input.iter().next() {
        if touch_input.just_pressed(touch.id()) && !egui_wants_pointer {
            press.start_position = Some(touch.position());
            press.is_dragging = false;
        } else if let Some(start) = press.start_position {
            if touch.position().distance(start) > DRAG_THRESHOLD {
                press.is_dragging = true;
            }
        }
    }
    for touch in touch_input.iter_just_released() {
        if !press.is_dragging && press.start_position.is_some() {
            release_pos = Some(touch.position());
        }
        press.start_position = None;
        press.is_dragging = false;
    }

    let hover = match cursor {
        Some(pos) if !egui_wants_pointer && !press.is_dragging => hit_at(pos),
        _ => None,
    };
    if hovered.0 != hover {
        hovered.0 = hover;
    }

    if let Some(site_id) = release_pos.and_then(hit_at) {
        debug!("Marker clicked: {}", site_id);
        clicked.write(SiteClicked { site_id });
    }
}

/// Swap materials, sphere size and ring visibility to match selection/hover
fn style_markers(
    assets: Option<Res<MarkerAssets>>,
    selected: Res<SelectedSite>,
    hovered: Res<HoveredSite>,
    markers: Query<(&SiteMarker, &Children)>,
    mut spheres: Query<
        (&mut MeshMaterial3d<StandardMaterial>, &mut Transform),
        With<MarkerSphere>,
    >,
    mut rings: Query<&mut Visibility, With<MarkerRing>>,
) {
    let Some(assets) = assets else {
        return;
    };

    for (marker, children) in &markers {
        let state = MarkerState {
            selected: selected.0.as_deref() == Some(marker.site_id.as_str()),
            hovered: hovered.0.as_deref() == Some(marker.site_id.as_str()),
        };
        let style = MarkerStyle::for_state(state);
        let material = assets.material(state);

        for child in children.iter() {
            if let Ok((mut sphere_material, mut transform)) = spheres.get_mut(child) {
                if &sphere_material.0 != material {
                    sphere_material.0 = material.clone();
                }
                let scale = Vec3::splat(style.radius);
                if transform.scale != scale {
                    transform.scale = scale;
                }
            }
            if let Ok(mut visibility) = rings.get_mut(child) {
                let wanted = if style.ring {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                };
                if *visibility != wanted {
                    *visibility = wanted;
                }
            }
        }
    }
}
