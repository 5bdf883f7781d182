//! Zhishan Scene - Bevy rendering for the terrain viewer
//!
//! Plugins in this crate load the terrain tile set, decide when the scene is
//! ready, frame and fly the camera, draw the site markers and the egui
//! overlay. The host supplies [`ViewerSettings`], [`Catalog`] and
//! [`SelectedSite`] and listens for [`SiteClicked`] and
//! [`ViewDetailRequested`].

pub mod camera;
pub mod context;
pub mod framing;
pub mod markers;
pub mod readiness;
pub mod tiles;
pub mod types;
pub mod ui;

use bevy::prelude::*;
use zhishan_core::ViewerConfig;

/// Plugin that sets up the whole terrain scene
pub struct ZhishanScenePlugin {
    pub config: ViewerConfig,
}

impl ZhishanScenePlugin {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }
}

impl Plugin for ZhishanScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ViewerSettings(self.config.clone()))
            .init_resource::<Catalog>()
            .init_resource::<SelectedSite>()
            .configure_sets(
                Update,
                (
                    ViewerSet::Tiles,
                    ViewerSet::Readiness,
                    ViewerSet::Camera,
                    ViewerSet::Markers,
                )
                    .chain(),
            )
            .add_plugins(readiness::ReadinessPlugin)
            .add_plugins(tiles::TilesPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(framing::FramingPlugin)
            .add_plugins(markers::MarkersPlugin)
            .add_plugins(context::RenderContextPlugin)
            .add_plugins(ui::OverlayPlugin);
    }
}

// Re-export commonly used types
pub use camera::{CameraDirector, MainCamera, OrbitCamera};
pub use context::RenderContextHealth;
pub use types::*;
