//! Host page behavior - selection ownership, navigation and URL parameters

use bevy::prelude::*;
use zhishan_scene::{AllTilesLoaded, SelectedSite, SiteClicked, ViewDetailRequested};

/// Plugin that reacts to the viewer's output messages the way the page does
pub struct HostPlugin;

impl Plugin for HostPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                select_clicked_site,
                deselect_on_escape,
                open_site_detail,
                report_readiness,
            ),
        );
    }
}

/// Page path of a site's detail view
pub fn site_detail_path(site_id: &str) -> String {
    format!("/site/{}", site_id)
}

/// Parse a query parameter from a search string
pub fn parse_query_param(search: &str, param: &str) -> Option<String> {
    let search = search.trim_start_matches('?');
    for pair in search.split('&') {
        let mut parts = pair.splitn(2, '=');
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if key == param && !value.is_empty() {
                return Some(value.replace("%20", " ").replace("%2F", "/"));
            }
        }
    }
    None
}

/// Site requested with `?site=<id>`
#[cfg(target_arch = "wasm32")]
pub fn initial_site() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    parse_query_param(&search, "site")
}

#[cfg(not(target_arch = "wasm32"))]
pub fn initial_site() -> Option<String> {
    None
}

fn select_clicked_site(
    mut clicks: MessageReader<SiteClicked>,
    mut selected: ResMut<SelectedSite>,
) {
    // Last click in the frame wins
    if let Some(click) = clicks.read().last() {
        if selected.0.as_deref() != Some(click.site_id.as_str()) {
            info!("Selected site {}", click.site_id);
            selected.0 = Some(click.site_id.clone());
        }
    }
}

/// Handle Escape key to deselect current selection
fn deselect_on_escape(
    mut selected: ResMut<SelectedSite>,
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    if keyboard.just_pressed(KeyCode::Escape) && selected.0.is_some() {
        selected.0 = None;
    }
}

fn open_site_detail(mut requests: MessageReader<ViewDetailRequested>) {
    let Some(request) = requests.read().last() else {
        return;
    };
    let path = site_detail_path(&request.site_id);

    #[cfg(target_arch = "wasm32")]
    {
        let navigated = web_sys::window()
            .map(|window| window.location().set_href(&path))
            .transpose();
        if let Err(e) = navigated {
            tracing::error!("Failed to open {}: {:?}", path, e);
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    info!("Would open {}", path);
}

fn report_readiness(mut ready: MessageReader<AllTilesLoaded>) {
    for msg in ready.read() {
        info!(
            "Map ready: {} tiles loaded, {} skipped",
            msg.loaded, msg.skipped
        );
    }
}
