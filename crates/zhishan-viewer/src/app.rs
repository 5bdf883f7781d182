//! Bevy application setup

use anyhow::Context;
use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use zhishan_core::{SiteCatalog, ViewerConfig};
use zhishan_scene::{Catalog, SelectedSite, ZhishanScenePlugin};

use crate::context_loss::ContextLossPlugin;
use crate::host::HostPlugin;

const EMBEDDED_CONFIG: &str = include_str!("../assets/viewer.toml");
const EMBEDDED_SITES: &str = include_str!("../assets/sites.json");

/// Configuration and catalog shipped with the viewer
pub fn load_embedded() -> anyhow::Result<(ViewerConfig, SiteCatalog)> {
    let config =
        ViewerConfig::from_toml(EMBEDDED_CONFIG).context("embedded viewer.toml is invalid")?;
    let catalog =
        SiteCatalog::from_json(EMBEDDED_SITES).context("embedded sites.json is invalid")?;
    Ok((config, catalog))
}

/// Keep a requested initial selection only if the catalog knows it
fn initial_selection(catalog: &SiteCatalog, requested: Option<String>) -> SelectedSite {
    match requested {
        Some(id) if catalog.get(&id).is_some() => {
            info!("Initial selection from URL: {}", id);
            SelectedSite(Some(id))
        }
        Some(id) => {
            warn!("Ignoring unknown site '{}' from URL", id);
            SelectedSite(None)
        }
        None => SelectedSite(None),
    }
}

pub fn run(config: ViewerConfig, catalog: SiteCatalog, initial_site: Option<String>) {
    let selection = initial_selection(&catalog, initial_site);
    info!(
        "Starting viewer with {} sites and {} tiles",
        catalog.len(),
        config.tiles.count
    );

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.08, 0.09, 0.12)))
        .insert_resource(WinitSettings::default())
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Zhishan Terrain Map".to_string(),
                        canvas: Some(crate::context_loss::CANVAS_SELECTOR.to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Tiles are served from the site root
                    file_path: "".to_string(),
                    // Don't look for .meta files - server doesn't have them
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // Picking must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(Catalog(catalog))
        .insert_resource(selection)
        .add_plugins(ZhishanScenePlugin::new(config))
        .add_plugins(HostPlugin)
        .add_plugins(ContextLossPlugin)
        .run();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_assets_load() {
        let (config, catalog) = load_embedded().unwrap();
        assert_eq!(config.tiles.count, 100);
        assert_eq!(config.tile_urls()[0], "mountain3D/9e7dca72aae0_1.gltf");
        assert_eq!(catalog.len(), 12);
        assert!(catalog.get("1").is_some());
    }

    #[test]
    fn test_initial_selection_checks_catalog() {
        let (_, catalog) = load_embedded().unwrap();
        assert_eq!(
            initial_selection(&catalog, Some("3".into())),
            SelectedSite(Some("3".into()))
        );
        assert_eq!(
            initial_selection(&catalog, Some("nope".into())),
            SelectedSite(None)
        );
        assert_eq!(initial_selection(&catalog, None), SelectedSite(None));
    }
}
