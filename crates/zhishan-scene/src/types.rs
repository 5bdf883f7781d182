//! Shared resources and messages between the scene plugins and the host

use bevy::prelude::*;
use zhishan_core::{Site, SiteCatalog, TileId, ViewerConfig};

/// Sites shown as markers. Replacing the catalog respawns every marker.
#[derive(Resource, Debug, Clone, Default, Deref, DerefMut)]
pub struct Catalog(pub SiteCatalog);

/// Id of the selected site. Owned by the host; the scene only reads it.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedSite(pub Option<String>);

/// Site under the pointer, if any
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct HoveredSite(pub Option<String>);

/// Viewer configuration the plugins were built with
#[derive(Resource, Debug, Clone, Default, Deref)]
pub struct ViewerSettings(pub ViewerConfig);

impl ViewerSettings {
    /// Scene-space anchor of a site, before any marker animation
    pub fn site_position(&self, site: &Site) -> Vec3 {
        site.project(&self.0.origin).as_vec3()
    }
}

/// Loading progress for the overlay
#[derive(Resource, Debug, Clone, Default)]
pub struct SceneStatus {
    pub expected: usize,
    pub completed: usize,
    pub skipped: usize,
    pub ready: bool,
}

/// A marker was clicked or tapped
#[derive(Message, Debug, Clone)]
pub struct SiteClicked {
    pub site_id: String,
}

/// The "View details" affordance on the selected marker was activated
#[derive(Message, Debug, Clone)]
pub struct ViewDetailRequested {
    pub site_id: String,
}

/// Fired once when the tile set is in the scene (possibly degraded)
#[derive(Message, Debug, Clone, Copy)]
pub struct AllTilesLoaded {
    pub loaded: usize,
    pub skipped: usize,
}

/// A camera flight reached its destination
#[derive(Message, Debug, Clone)]
pub struct FlightFinished {
    pub site_id: Option<String>,
}

/// Fly back to the selected site, or to the whole-scene view
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct RecenterRequested;

/// Tear the terrain down and load it again
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ReloadTiles;

/// A tile's nodes are in the scene
#[derive(Message, Debug, Clone, Copy)]
pub struct TileLoaded {
    pub tile: TileId,
}

/// A tile was dropped from the set without ever being inserted
#[derive(Message, Debug, Clone, Copy)]
pub struct TileSkipped {
    pub tile: TileId,
}

/// The browser dropped the GPU context
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct RenderContextLost;

/// The browser gave the GPU context back
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct RenderContextRestored;

/// Ordering of the per-frame scene work
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerSet {
    /// Asset polling, deferred insertion, timeouts
    Tiles,
    /// Readiness counting and auto-framing
    Readiness,
    /// User input and camera flights
    Camera,
    /// Marker spawning, animation and picking
    Markers,
}
