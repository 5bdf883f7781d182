//! Zhishan Viewer - browser host for the 3D terrain map
//!
//! Embeds the default configuration and site catalog, owns the selection,
//! and bridges browser events (query string, GPU context loss, navigation)
//! into the scene plugins.

mod app;
mod context_loss;
mod host;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    let embedded = app::load_embedded();
    let max_level = embedded
        .as_ref()
        .ok()
        .and_then(|(config, _)| config.log_level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::WARN);

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(max_level)
            .build(),
    );

    let (config, catalog) = match embedded {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Falling back to defaults: {:#}", e);
            Default::default()
        }
    };

    app::run(config, catalog, host::initial_site());
}
