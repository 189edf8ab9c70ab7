use eframe::egui;
use tracing::{debug, error};

use mandelview_render::{effective_iterations, Frame, RenderPhase};

use crate::app::ViewerApp;

impl ViewerApp {
    /// Recompute the iteration cap and launch a new generation. The renderer
    /// cancels and drains the previous one first.
    pub(crate) fn request_render(&mut self) {
        self.needs_render = false;
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        self.viewport
            .set_max_iterations(effective_iterations(self.viewport.zoom, self.iteration_multiplier));
        let frame = Frame::new(self.viewport, &self.palette, self.color_mode);

        match renderer.render_generation(frame) {
            Ok(generation) => {
                debug!(generation, max_iter = self.viewport.max_iterations, "Render requested");
                self.last_error = None;
            }
            Err(e) => {
                error!("Render failed to start: {e}");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Collect worker progress and re-upload the texture after every
    /// finished pass.
    pub(crate) fn poll_render(&mut self, ctx: &egui::Context) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let status = renderer.poll();
        self.status = Some(status);
        if !status.frame_ready {
            return;
        }

        let buffer = renderer.buffer();
        let size = [buffer.width() as usize, buffer.height() as usize];
        let image = egui::ColorImage::from_rgba_unmultiplied(size, &buffer.to_rgba8());
        match self.texture.as_mut() {
            Some(tex) => tex.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("fractal", image, egui::TextureOptions::NEAREST))
            }
        }
    }

    pub(crate) fn check_resize(&mut self, width: u32, height: u32) {
        if self.viewport.resize(width, height) {
            self.needs_render = true;
        }
    }

    pub(crate) fn is_rendering(&self) -> bool {
        self.status
            .is_some_and(|s| s.phase == RenderPhase::Rendering)
    }
}
