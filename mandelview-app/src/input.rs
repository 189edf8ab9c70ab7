use eframe::egui;

use crate::app::{ViewerApp, POINTS_PER_NOTCH};

impl ViewerApp {
    pub(crate) fn handle_canvas_input(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let origin = response.rect.min;
        let local = |pos: egui::Pos2| ((pos.x - origin.x) as f64, (pos.y - origin.y) as f64);

        self.cursor_complex = response.hover_pos().map(|pos| {
            let (sx, sy) = local(pos);
            self.viewport.screen_to_complex(sx, sy)
        });

        let scroll_y = ctx.input(|i| i.raw_scroll_delta.y);
        if scroll_y.abs() > 0.0 && response.hovered() {
            if let Some(pos) = response.hover_pos() {
                let (sx, sy) = local(pos);
                let notches = (scroll_y / POINTS_PER_NOTCH) as f64;
                if self.viewport.wheel_zoom(sx, sy, notches) {
                    self.needs_render = true;
                }
            }
        }

        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                let (sx, sy) = local(pos);
                self.viewport.begin_drag(sx, sy);
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                let (sx, sy) = local(pos);
                if self.viewport.drag_to(sx, sy) {
                    self.needs_render = true;
                }
            }
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            self.viewport.end_drag();
        }
    }

    pub(crate) fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let mut quit = false;

        ctx.input(|input| {
            if input.key_pressed(egui::Key::Period) {
                self.double_iterations();
            }
            if input.key_pressed(egui::Key::Comma) {
                self.halve_iterations();
            }
            if input.key_pressed(egui::Key::Slash) {
                self.toggle_color_mode();
            }
            if input.key_pressed(egui::Key::M) {
                self.cycle_palette();
            }
            if input.key_pressed(egui::Key::H) {
                self.show_hud = !self.show_hud;
            }
            if input.key_pressed(egui::Key::R) {
                self.reset_view();
            }
            if input.key_pressed(egui::Key::Escape) {
                quit = true;
            }
        });

        if quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn reset_view(&mut self) {
        let (w, h) = (self.viewport.width, self.viewport.height);
        self.viewport = mandelview_core::Viewport::default_view(w, h);
        self.needs_render = true;
    }
}
