//! Terrain tiles - load, defer, insert, time out and dispose the glTF tile set
//!
//! Every tile gets its own scene instance under the [`TileGroup`] and its own
//! copies of the meshes it draws, so disposing one mount never touches the
//! cached glTF or another tile.

use bevy::gltf::Gltf;
use bevy::prelude::*;
use bevy::scene::{SceneInstance, SceneSpawner};
use std::collections::HashSet;
use zhishan_core::{SkipReason, TileId, TileLedger};

use crate::camera::MainCamera;
use crate::readiness::SceneReadiness;
use crate::types::*;

/// Plugin that owns the terrain tile lifecycle
pub struct TilesPlugin;

impl Plugin for TilesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TerrainTiles>()
            .add_message::<ReloadTiles>()
            .add_systems(Startup, (spawn_tile_group, request_tiles).chain())
            .add_systems(
                Update,
                (
                    reload_tiles,
                    poll_tile_assets,
                    expire_stalled_tiles,
                    insert_due_tiles,
                    confirm_tile_instances,
                )
                    .chain()
                    .in_set(ViewerSet::Tiles),
            )
            .add_systems(Last, release_tiles_on_exit);
    }
}

/// Parent of every tile instance
#[derive(Component)]
pub struct TileGroup;

/// Root of one tile's scene instance
#[derive(Component, Debug)]
pub struct TileNode {
    pub tile: TileId,
    /// Mesh copies owned by this mount, released on teardown
    pub meshes: Vec<AssetId<Mesh>>,
}

/// Scene instance spawned, nodes not yet confirmed
#[derive(Component)]
struct AwaitingInstance;

/// Tile bookkeeping plus the asset handles keeping the sources alive
#[derive(Resource)]
pub struct TerrainTiles {
    pub ledger: TileLedger<Entity>,
    handles: Vec<Handle<Gltf>>,
    group: Option<Entity>,
}

impl Default for TerrainTiles {
    fn default() -> Self {
        Self {
            ledger: TileLedger::new(Vec::new(), 0, Default::default()),
            handles: Vec::new(),
            group: None,
        }
    }
}

fn spawn_tile_group(mut commands: Commands, mut tiles: ResMut<TerrainTiles>) {
    let group = commands
        .spawn((
            Name::new("Terrain"),
            TileGroup,
            Transform::default(),
            Visibility::default(),
        ))
        .id();
    tiles.group = Some(group);
}

/// Kick off every tile load and reset the readiness count to match
fn begin_loading(
    tiles: &mut TerrainTiles,
    readiness: &mut SceneReadiness,
    settings: &ViewerSettings,
    asset_server: &AssetServer,
    now: std::time::Duration,
) {
    let urls = settings.tile_urls();
    info!("Requesting {} terrain tiles", urls.len());

    tiles.handles = urls
        .iter()
        .map(|url| asset_server.load::<Gltf>(url.clone()))
        .collect();
    readiness.restart(urls.len(), settings.tiles.settle_delay());
    tiles.ledger = TileLedger::new(urls, settings.tiles.insert_delay_frames, now);
}

fn request_tiles(
    mut tiles: ResMut<TerrainTiles>,
    mut readiness: ResMut<SceneReadiness>,
    settings: Res<ViewerSettings>,
    asset_server: Res<AssetServer>,
    time: Res<Time>,
) {
    begin_loading(
        &mut tiles,
        &mut readiness,
        &settings,
        &asset_server,
        time.elapsed(),
    );
}

fn poll_tile_assets(
    mut tiles: ResMut<TerrainTiles>,
    asset_server: Res<AssetServer>,
    mut skipped: MessageWriter<TileSkipped>,
) {
    let loading: Vec<TileId> = tiles.ledger.loading().collect();
    for id in loading {
        let Some(handle_id) = tiles.handles.get(id.0).map(|h| h.id()) else {
            continue;
        };
        match asset_server.get_load_state(handle_id) {
            Some(bevy::asset::LoadState::Loaded) => {
                tiles.ledger.mark_decoded(id);
            }
            Some(bevy::asset::LoadState::Failed(err)) => {
                let reason = SkipReason::Failed(err.to_string());
                warn!("Skipping {} ({}): {}", id, tiles.ledger.url(id).unwrap_or("?"), reason);
                if tiles.ledger.skip(id, reason) {
                    skipped.write(TileSkipped { tile: id });
                }
            }
            _ => {}
        }
    }
}

fn expire_stalled_tiles(
    mut tiles: ResMut<TerrainTiles>,
    settings: Res<ViewerSettings>,
    time: Res<Time>,
    mut skipped: MessageWriter<TileSkipped>,
) {
    let Some(timeout) = settings.tiles.timeout() else {
        return;
    };
    for id in tiles.ledger.expire(time.elapsed(), timeout) {
        warn!(
            "Skipping {} ({}): no response after {:?}",
            id,
            tiles.ledger.url(id).unwrap_or("?"),
            timeout
        );
        skipped.write(TileSkipped { tile: id });
    }
}

/// Insert tiles whose frame delay has run out
fn insert_due_tiles(
    mut commands: Commands,
    mut tiles: ResMut<TerrainTiles>,
    gltfs: Res<Assets<Gltf>>,
    mut skipped: MessageWriter<TileSkipped>,
) {
    let Some(group) = tiles.group else {
        return;
    };

    for id in tiles.ledger.advance_frame() {
        let scene = tiles
            .handles
            .get(id.0)
            .and_then(|handle| gltfs.get(handle))
            .and_then(|gltf| {
                gltf.default_scene
                    .clone()
                    .or_else(|| gltf.scenes.first().cloned())
            });

        let Some(scene) = scene else {
            warn!("Skipping {}: asset has no scene", id);
            if tiles
                .ledger
                .skip(id, SkipReason::Failed("no scene in asset".to_string()))
            {
                skipped.write(TileSkipped { tile: id });
            }
            continue;
        };

        let name = tiles.ledger.url(id).unwrap_or_default().to_string();
        let entity = commands
            .spawn((
                Name::new(name),
                SceneRoot(scene),
                Transform::default(),
                Visibility::default(),
                TileNode {
                    tile: id,
                    meshes: Vec::new(),
                },
                AwaitingInstance,
                ChildOf(group),
            ))
            .id();

        if let Err(entity) = tiles.ledger.insert(id, entity) {
            commands.entity(entity).despawn();
        }
    }
}

/// Give a spawned tile private copies of the meshes it draws and switch off
/// any cameras baked into the asset. Returns the ids of the copies.
fn adopt_tile_nodes(
    root: Entity,
    children: &Query<&Children>,
    mesh_handles: &mut Query<&mut Mesh3d>,
    embedded_cameras: &mut Query<&mut Camera, Without<MainCamera>>,
    meshes: &mut Assets<Mesh>,
) -> Vec<AssetId<Mesh>> {
    let mut owned_ids = Vec::new();
    for descendant in children.iter_descendants(root) {
        if let Ok(mut mesh) = mesh_handles.get_mut(descendant) {
            if let Some(copy) = meshes.get(&mesh.0).cloned() {
                let owned = meshes.add(copy);
                owned_ids.push(owned.id());
                mesh.0 = owned;
            }
        }
        if let Ok(mut camera) = embedded_cameras.get_mut(descendant) {
            debug!("Deactivating camera embedded under {:?}", root);
            camera.is_active = false;
        }
    }
    owned_ids
}

/// Once a tile's scene has spawned, adopt its nodes and report it loaded
fn confirm_tile_instances(
    mut commands: Commands,
    scene_spawner: Res<SceneSpawner>,
    mut pending: Query<(Entity, &mut TileNode, &SceneInstance), With<AwaitingInstance>>,
    children: Query<&Children>,
    mut mesh_handles: Query<&mut Mesh3d>,
    mut embedded_cameras: Query<&mut Camera, Without<MainCamera>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut loaded: MessageWriter<TileLoaded>,
) {
    for (entity, mut node, instance) in &mut pending {
        if !scene_spawner.instance_is_ready(**instance) {
            continue;
        }

        let owned = adopt_tile_nodes(
            entity,
            &children,
            &mut mesh_handles,
            &mut embedded_cameras,
            &mut meshes,
        );
        debug!("{} mounted with {} meshes", node.tile, owned.len());
        node.meshes.extend(owned);

        commands.entity(entity).remove::<AwaitingInstance>();
        loaded.write(TileLoaded { tile: node.tile });
    }
}

/// Despawn every inserted tile and free its mesh copies.
///
/// Materials are left alone since the cached glTF may share them. Returns the
/// number of tiles released; a second call releases nothing.
fn release_tiles(
    commands: &mut Commands,
    tiles: &mut TerrainTiles,
    nodes: &Query<&TileNode>,
    meshes: &mut Assets<Mesh>,
) -> usize {
    let released = tiles.ledger.teardown();
    let mut mesh_ids = HashSet::new();
    for entity in &released {
        if let Ok(node) = nodes.get(*entity) {
            mesh_ids.extend(node.meshes.iter().copied());
        }
        if let Ok(mut node) = commands.get_entity(*entity) {
            node.try_despawn();
        }
    }
    for id in mesh_ids {
        // Already-removed meshes are a no-op
        meshes.remove(id);
    }
    tiles.handles.clear();
    released.len()
}

/// Tear down and reload on request, or when the configured tile set changes
fn reload_tiles(
    mut commands: Commands,
    mut requests: MessageReader<ReloadTiles>,
    mut tiles: ResMut<TerrainTiles>,
    mut readiness: ResMut<SceneReadiness>,
    nodes: Query<&TileNode>,
    mut meshes: ResMut<Assets<Mesh>>,
    settings: Res<ViewerSettings>,
    asset_server: Res<AssetServer>,
    time: Res<Time>,
) {
    let requested = requests.read().count() > 0;
    let reconfigured = settings.is_changed()
        && !settings
            .tile_urls()
            .iter()
            .map(String::as_str)
            .eq(tiles.ledger.urls());
    if !requested && !reconfigured {
        return;
    }

    let released = release_tiles(&mut commands, &mut tiles, &nodes, &mut meshes);
    if reconfigured {
        info!("Tile set changed, released {} tiles", released);
    } else {
        info!("Reloading terrain, released {} tiles", released);
    }
    begin_loading(
        &mut tiles,
        &mut readiness,
        &settings,
        &asset_server,
        time.elapsed(),
    );
}

fn release_tiles_on_exit(
    mut commands: Commands,
    mut exit: MessageReader<AppExit>,
    mut tiles: ResMut<TerrainTiles>,
    nodes: Query<&TileNode>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if exit.read().count() == 0 {
        return;
    }
    let released = release_tiles(&mut commands, &mut tiles, &nodes, &mut meshes);
    info!("Viewer shutting down, released {} tiles", released);
}
