//! GPU context loss - keep the viewer alive while the browser has no context

use bevy::prelude::*;

use crate::camera::CameraDirector;
use crate::types::*;

/// Plugin that reacts to render context loss and restore notifications
pub struct RenderContextPlugin;

impl Plugin for RenderContextPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderContextHealth>()
            .add_message::<RenderContextLost>()
            .add_message::<RenderContextRestored>()
            .add_systems(
                Update,
                handle_render_context.before(ViewerSet::Camera),
            );
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct RenderContextHealth {
    pub lost: bool,
    pub losses: u32,
}

fn handle_render_context(
    mut lost: MessageReader<RenderContextLost>,
    mut restored: MessageReader<RenderContextRestored>,
    mut health: ResMut<RenderContextHealth>,
    director: Option<ResMut<CameraDirector>>,
) {
    let was_lost = lost.read().count() > 0;
    let was_restored = restored.read().count() > 0;

    if was_lost {
        health.lost = true;
        health.losses += 1;
        warn!("Render context lost ({} so far)", health.losses);
        // Nothing to draw a flight onto
        if let Some(mut director) = director {
            director.choreographer.cancel();
        }
    }
    if was_restored && health.lost {
        health.lost = false;
        info!("Render context restored");
    }
}
