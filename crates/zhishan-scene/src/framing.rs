//! Auto-framing - point the camera at the terrain once it has landed

use bevy::camera::primitives::MeshAabb;
use bevy::prelude::*;
use zhishan_core::{Bounds, PoseController};

use crate::camera::{CameraDirector, OrbitCamera};
use crate::tiles::TileGroup;
use crate::types::*;

/// Plugin that frames the terrain on the first readiness signal
pub struct FramingPlugin;

impl Plugin for FramingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            frame_terrain
                .after(crate::readiness::poll_readiness)
                .in_set(ViewerSet::Readiness),
        );
    }
}

/// World-space bounds of a mesh with the given transform
pub fn mesh_world_bounds(mesh: &Mesh, transform: &GlobalTransform) -> Option<Bounds> {
    let aabb = mesh.compute_aabb()?;
    let center = Vec3::from(aabb.center);
    let half = Vec3::from(aabb.half_extents);

    let corners = (0..8).map(|i| {
        let sign = Vec3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        transform.transform_point(center + half * sign)
    });
    Some(Bounds::from_points(corners))
}

fn frame_terrain(
    mut ready: MessageReader<AllTilesLoaded>,
    mut director: ResMut<CameraDirector>,
    mut orbit: ResMut<OrbitCamera>,
    settings: Res<ViewerSettings>,
    groups: Query<Entity, With<TileGroup>>,
    children: Query<&Children>,
    mesh_query: Query<(&Mesh3d, &GlobalTransform)>,
    meshes: Res<Assets<Mesh>>,
) {
    if ready.read().count() == 0 || director.framer.is_initialized() {
        return;
    }

    let mut bounds = Bounds::EMPTY;
    for group in &groups {
        for entity in children.iter_descendants(group) {
            let Ok((mesh_handle, transform)) = mesh_query.get(entity) else {
                continue;
            };
            if let Some(mesh_bounds) = meshes
                .get(&mesh_handle.0)
                .and_then(|mesh| mesh_world_bounds(mesh, transform))
            {
                bounds = bounds.union(&mesh_bounds);
            }
        }
    }

    match director
        .framer
        .try_frame(&bounds, settings.camera.fov_radians())
    {
        Some(pose) => {
            info!(
                "Framed terrain: center {:?}, size {:?}",
                bounds.center(),
                bounds.size()
            );
            orbit.set_pose(pose);
        }
        None => warn!("Terrain bounds are empty, keeping the initial camera"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_world_bounds_applies_transform() {
        let mesh = Mesh::from(Cuboid::new(2.0, 4.0, 6.0));
        let transform = GlobalTransform::from(
            Transform::from_xyz(10.0, 0.0, -5.0).with_scale(Vec3::splat(2.0)),
        );

        let bounds = mesh_world_bounds(&mesh, &transform).unwrap();
        assert!(bounds.min.abs_diff_eq(Vec3::new(8.0, -4.0, -11.0), 1e-4));
        assert!(bounds.max.abs_diff_eq(Vec3::new(12.0, 4.0, 1.0), 1e-4));
    }

    #[test]
    fn test_mesh_world_bounds_rotated() {
        let mesh = Mesh::from(Cuboid::new(2.0, 2.0, 10.0));
        let transform =
            GlobalTransform::from(Transform::from_rotation(Quat::from_rotation_y(
                std::f32::consts::FRAC_PI_2,
            )));

        let bounds = mesh_world_bounds(&mesh, &transform).unwrap();
        assert!((bounds.size().x - 10.0).abs() < 1e-3);
        assert!((bounds.size().z - 2.0).abs() < 1e-3);
    }
}
