//! egui overlay - loading indicator, recenter button, marker labels

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use zhishan_core::markers::LABEL_HEIGHT;

use crate::camera::MainCamera;
use crate::context::RenderContextHealth;
use crate::markers::SiteMarker;
use crate::types::*;

/// Plugin for the on-canvas overlay
pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ViewDetailRequested>()
            // Runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, overlay_system);
    }
}

const LABEL_BG: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 170);

#[allow(clippy::too_many_arguments)]
fn overlay_system(
    mut contexts: EguiContexts,
    status: Res<SceneStatus>,
    health: Res<RenderContextHealth>,
    catalog: Res<Catalog>,
    selected: Res<SelectedSite>,
    hovered: Res<HoveredSite>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    markers: Query<(&SiteMarker, &GlobalTransform)>,
    mut recenter: MessageWriter<RecenterRequested>,
    mut view_detail: MessageWriter<ViewDetailRequested>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    if health.lost {
        egui::TopBottomPanel::top("context_lost").show(ctx, |ui| {
            ui.colored_label(
                egui::Color32::from_rgb(255, 180, 60),
                "Graphics context lost, waiting for the browser to restore it...",
            );
        });
    }

    if !status.ready {
        egui::Area::new(egui::Id::new("loading"))
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.spinner();
                        ui.label("Loading terrain...");
                        if status.expected > 0 {
                            ui.label(
                                egui::RichText::new(format!(
                                    "{} / {}",
                                    status.completed, status.expected
                                ))
                                .small()
                                .color(egui::Color32::GRAY),
                            );
                        }
                    });
                });
            });
    }

    egui::Area::new(egui::Id::new("recenter"))
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
        .show(ctx, |ui| {
            if ui
                .button(egui::RichText::new("Recenter").size(15.0))
                .on_hover_text("Fly back to the selected site or the whole map")
                .clicked()
            {
                recenter.write(RecenterRequested);
            }
        });

    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    for (marker, transform) in &markers {
        let Some(site) = catalog.get(&marker.site_id) else {
            continue;
        };
        let scale = transform.compute_transform().scale.y;
        let label_anchor = transform.translation() + Vec3::Y * LABEL_HEIGHT * scale;
        let Ok(screen) = camera.world_to_viewport(camera_transform, label_anchor) else {
            continue;
        };

        let is_selected = selected.0.as_deref() == Some(site.id.as_str());
        let is_hovered = hovered.0.as_deref() == Some(site.id.as_str());

        egui::Area::new(egui::Id::new(("site_label", site.id.as_str())))
            .fixed_pos(egui::pos2(screen.x, screen.y))
            .pivot(egui::Align2::CENTER_BOTTOM)
            .interactable(is_selected)
            .order(egui::Order::Background)
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(LABEL_BG)
                    .corner_radius(4.0)
                    .inner_margin(egui::Margin::symmetric(6, 3))
                    .show(ui, |ui| {
                        let text = egui::RichText::new(&site.name).color(if is_hovered || is_selected {
                            egui::Color32::WHITE
                        } else {
                            egui::Color32::LIGHT_GRAY
                        });
                        ui.label(if is_selected { text.strong() } else { text });

                        if is_selected {
                            if let Some(year) = &site.year {
                                ui.label(egui::RichText::new(year).small().color(egui::Color32::GRAY));
                            }
                            if ui.button("View details").clicked() {
                                view_detail.write(ViewDetailRequested {
                                    site_id: site.id.clone(),
                                });
                            }
                        }
                    });
            });
    }
}
