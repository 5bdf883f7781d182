//! Scene readiness - turns per-tile completions into one AllTilesLoaded

use bevy::prelude::*;
use std::time::Duration;
use zhishan_core::ReadinessTracker;

use crate::types::*;

/// Plugin that counts tile completions and announces readiness
pub struct ReadinessPlugin;

impl Plugin for ReadinessPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneReadiness>()
            .init_resource::<SceneStatus>()
            .add_message::<TileLoaded>()
            .add_message::<TileSkipped>()
            .add_message::<AllTilesLoaded>()
            .add_systems(
                Update,
                (count_tile_completions, poll_readiness)
                    .chain()
                    .in_set(ViewerSet::Readiness),
            );
    }
}

/// Readiness tracker for the current tile set
#[derive(Resource, Debug, Deref, DerefMut)]
pub struct SceneReadiness(pub ReadinessTracker);

impl Default for SceneReadiness {
    fn default() -> Self {
        Self(ReadinessTracker::new(0, Duration::ZERO))
    }
}

impl SceneReadiness {
    /// Start counting a fresh tile set
    pub fn restart(&mut self, expected: usize, settle: Duration) {
        self.0 = ReadinessTracker::new(expected, settle);
    }
}

fn count_tile_completions(
    mut loaded: MessageReader<TileLoaded>,
    mut skipped: MessageReader<TileSkipped>,
    mut readiness: ResMut<SceneReadiness>,
    time: Res<Time>,
) {
    let now = time.elapsed();
    for msg in loaded.read() {
        if !readiness.notify_tile_loaded(now) {
            debug!("Ignoring completion of {} past the expected count", msg.tile);
        }
    }
    for msg in skipped.read() {
        if readiness.skip_tile(now) {
            debug!("{} dropped from the expected count", msg.tile);
        }
    }
}

pub(crate) fn poll_readiness(
    mut readiness: ResMut<SceneReadiness>,
    mut status: ResMut<SceneStatus>,
    mut all_loaded: MessageWriter<AllTilesLoaded>,
    time: Res<Time>,
) {
    let outcome = readiness.poll(time.elapsed());

    let next = SceneStatus {
        expected: readiness.expected(),
        completed: readiness.completed(),
        skipped: readiness.skipped(),
        ready: readiness.is_ready(),
    };
    if status.expected != next.expected
        || status.completed != next.completed
        || status.skipped != next.skipped
        || status.ready != next.ready
    {
        *status = next;
    }

    if let Some(outcome) = outcome {
        if outcome.is_degraded() {
            warn!(
                "Terrain ready with {} tiles, {} skipped",
                outcome.loaded, outcome.skipped
            );
        } else {
            info!("Terrain ready with {} tiles", outcome.loaded);
        }
        all_loaded.write(AllTilesLoaded {
            loaded: outcome.loaded,
            skipped: outcome.skipped,
        });
    }
}
