//! Browser GPU context loss/restore bridge
//!
//! The canvas fires `webglcontextlost` / `webglcontextrestored` outside the
//! Bevy schedule. Listeners push into a shared queue that a system drains
//! into scene messages each frame.

use bevy::prelude::*;
use std::sync::{Arc, Mutex};
use zhishan_scene::{RenderContextLost, RenderContextRestored};

/// Canvas the app renders into
pub const CANVAS_SELECTOR: &str = "#viewer-canvas";

/// Plugin that installs the canvas listeners and forwards their events
pub struct ContextLossPlugin;

impl Plugin for ContextLossPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingContextEvents>()
            .add_systems(Startup, install_context_listeners)
            .add_systems(Update, forward_context_events);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextEvent {
    Lost,
    Restored,
}

/// Events queued by the browser listeners
#[derive(Resource, Default, Clone)]
pub struct PendingContextEvents(pub Arc<Mutex<Vec<ContextEvent>>>);

impl PendingContextEvents {
    pub fn push(&self, event: ContextEvent) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(event);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn install_context_listeners(pending: Res<PendingContextEvents>) {
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;

    let Some(canvas) = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.query_selector(CANVAS_SELECTOR).ok().flatten())
    else {
        tracing::warn!("Canvas {} not found, context loss will not be handled", CANVAS_SELECTOR);
        return;
    };

    let lost_queue = pending.clone();
    let on_lost = Closure::wrap(Box::new(move |e: web_sys::Event| {
        // Allow the browser to restore the context later
        e.prevent_default();
        lost_queue.push(ContextEvent::Lost);
    }) as Box<dyn FnMut(web_sys::Event)>);

    let restored_queue = pending.clone();
    let on_restored = Closure::wrap(Box::new(move |_e: web_sys::Event| {
        restored_queue.push(ContextEvent::Restored);
    }) as Box<dyn FnMut(web_sys::Event)>);

    for (event, callback) in [
        ("webglcontextlost", &on_lost),
        ("webglcontextrestored", &on_restored),
    ] {
        if let Err(e) =
            canvas.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        {
            tracing::error!("Failed to listen for {}: {:?}", event, e);
        }
    }
    on_lost.forget();
    on_restored.forget();
}

#[cfg(not(target_arch = "wasm32"))]
fn install_context_listeners() {}

fn forward_context_events(
    pending: Res<PendingContextEvents>,
    mut lost: MessageWriter<RenderContextLost>,
    mut restored: MessageWriter<RenderContextRestored>,
) {
    let events = {
        if let Ok(mut queue) = pending.0.lock() {
            std::mem::take(&mut *queue)
        } else {
            Vec::new()
        }
    };

    for event in events {
        match event {
            ContextEvent::Lost => {
                lost.write(RenderContextLost);
            }
            ContextEvent::Restored => {
                restored.write(RenderContextRestored);
            }
        }
    }
}
