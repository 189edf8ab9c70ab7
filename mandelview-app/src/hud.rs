use eframe::egui;

use mandelview_render::RenderPhase;

use crate::app::{ViewerApp, HUD_CORNER_RADIUS, HUD_MARGIN};

impl ViewerApp {
    pub(crate) fn show_hud(&mut self, ctx: &egui::Context) {
        if !self.show_hud {
            return;
        }

        egui::Area::new(egui::Id::new("hud_params"))
            .anchor(egui::Align2::LEFT_TOP, [HUD_MARGIN, HUD_MARGIN])
            .show(ctx, |ui| {
                egui::Frame::NONE
                    .fill(egui::Color32::from_black_alpha(166))
                    .inner_margin(egui::Margin::same(8))
                    .corner_radius(HUD_CORNER_RADIUS)
                    .show(ui, |ui| {
                        ui.style_mut().visuals.override_text_color =
                            Some(egui::Color32::from_rgb(220, 220, 220));

                        ui.label(format!("Center: {}", self.viewport.offset));
                        ui.label(format!("Zoom: {:.3e} / px", self.viewport.zoom));
                        ui.label(format!(
                            "Iterations: {} (\u{00d7}{})",
                            self.viewport.max_iterations, self.iteration_multiplier
                        ));
                        ui.label(format!(
                            "Palette: {} ({})",
                            self.palette.name,
                            self.color_mode.label()
                        ));
                        if let Some(c) = self.cursor_complex {
                            ui.label(format!("Cursor: {c}"));
                        }

                        match self.status {
                            Some(status) if status.phase == RenderPhase::Rendering => {
                                ui.label(format!(
                                    "{} {}/{}",
                                    status.phase.label(),
                                    status.passes_done,
                                    status.passes_total
                                ));
                            }
                            Some(status) => {
                                ui.label(format!(
                                    "{} in {:.0} ms",
                                    status.phase.label(),
                                    status.elapsed.as_secs_f64() * 1000.0
                                ));
                            }
                            None => {}
                        }
                        if let Some(renderer) = self.renderer.as_ref() {
                            ui.weak(format!("{} workers", renderer.workers()));
                        }

                        if let Some(ref err) = self.last_error {
                            ui.colored_label(egui::Color32::from_rgb(255, 180, 50), err);
                        }
                    });
            });
    }
}
