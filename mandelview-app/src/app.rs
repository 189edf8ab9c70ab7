use eframe::egui;
use tracing::{error, info};

use mandelview_core::{Complex, Viewport};
use mandelview_render::palette::advance;
use mandelview_render::{ColorMode, Palette, RenderConfig, RenderPhase, RenderStatus, Renderer};

use crate::preferences::{AppPreferences, MIN_ITERATION_MULTIPLIER};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Scroll distance egui reports for one mouse-wheel notch.
pub(crate) const POINTS_PER_NOTCH: f32 = 50.0;
pub(crate) const HUD_MARGIN: f32 = 8.0;
pub(crate) const HUD_CORNER_RADIUS: f32 = 4.0;

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub(crate) struct ViewerApp {
    pub(crate) preferences: AppPreferences,
    /// `None` when no worker pool could be started.
    pub(crate) renderer: Option<Renderer>,
    pub(crate) viewport: Viewport,
    pub(crate) palette: Palette,
    pub(crate) palette_index: usize,
    pub(crate) color_mode: ColorMode,
    pub(crate) iteration_multiplier: f64,
    pub(crate) texture: Option<egui::TextureHandle>,
    pub(crate) status: Option<RenderStatus>,
    pub(crate) needs_render: bool,
    pub(crate) show_hud: bool,
    pub(crate) cursor_complex: Option<Complex>,
    pub(crate) last_error: Option<String>,
}

impl ViewerApp {
    pub(crate) fn new(preferences: AppPreferences) -> Self {
        let mut last_error = None;

        let renderer = match Renderer::new(RenderConfig {
            workers: preferences.workers,
            ..RenderConfig::default()
        }) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                error!("Failed to start renderer: {e}");
                last_error = Some(e.to_string());
                None
            }
        };

        let width = preferences.window_width.max(1.0) as u32;
        let height = preferences.window_height.max(1.0) as u32;
        let viewport = preferences
            .last_view
            .filter(|_| preferences.restore_last_view)
            .unwrap_or_else(|| Viewport::default_view(width, height));

        let palette_index = preferences.palette_index;
        let palette = match Palette::from_catalog(palette_index, preferences.lut_size) {
            Ok(palette) => palette,
            Err(e) => {
                error!("Failed to build palette {palette_index}: {e}");
                Palette::default()
            }
        };

        Self {
            color_mode: preferences.color_mode(),
            iteration_multiplier: preferences.iteration_multiplier,
            show_hud: preferences.show_hud,
            preferences,
            renderer,
            viewport,
            palette,
            palette_index,
            texture: None,
            status: None,
            needs_render: true,
            cursor_complex: None,
            last_error,
        }
    }

    // -- Palette / colouring --

    pub(crate) fn cycle_palette(&mut self) {
        let next = advance(self.palette_index);
        match Palette::from_catalog(next, self.preferences.lut_size) {
            Ok(palette) => {
                info!(palette = palette.name, "Palette changed");
                self.palette = palette;
                self.palette_index = next;
                self.needs_render = true;
            }
            Err(e) => {
                error!("Failed to build palette {next}: {e}");
                self.last_error = Some(e.to_string());
            }
        }
    }

    pub(crate) fn toggle_color_mode(&mut self) {
        self.color_mode = self.color_mode.toggled();
        info!(mode = self.color_mode.label(), "Color mode changed");
        self.needs_render = true;
    }

    // -- Iterations --

    pub(crate) fn double_iterations(&mut self) {
        self.iteration_multiplier *= 2.0;
        info!(multiplier = self.iteration_multiplier, "Iteration multiplier");
        self.needs_render = true;
    }

    pub(crate) fn halve_iterations(&mut self) {
        if self.iteration_multiplier > MIN_ITERATION_MULTIPLIER {
            self.iteration_multiplier /= 2.0;
            info!(multiplier = self.iteration_multiplier, "Iteration multiplier");
            self.needs_render = true;
        }
    }

    fn store_preferences(&mut self) {
        let prefs = &mut self.preferences;
        prefs.palette_index = self.palette_index;
        prefs.cyclic_coloring = self.color_mode == ColorMode::Cyclic;
        prefs.iteration_multiplier = self.iteration_multiplier;
        prefs.show_hud = self.show_hud;
        prefs.window_width = self.viewport.width as f32;
        prefs.window_height = self.viewport.height as f32;
        prefs.last_view = Some(self.viewport);
        prefs.save();
    }

    // -- Canvas --

    fn draw_canvas(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let available = ui.available_size();
        let width = available.x.max(1.0) as u32;
        let height = available.y.max(1.0) as u32;

        self.check_resize(width, height);

        if self.needs_render {
            self.request_render();
        }
        self.poll_render(ctx);

        let (response, painter) = ui.allocate_painter(available, egui::Sense::click_and_drag());

        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        if let Some(ref tex) = self.texture {
            painter.image(tex.id(), response.rect, uv, egui::Color32::WHITE);
        }

        if let Some(status) = self.status.filter(|s| s.passes_total > 0) {
            if status.phase == RenderPhase::Rendering {
                let frac =
                    (status.passes_done as f32 / status.passes_total as f32).clamp(0.0, 1.0);
                let bar_h = 3.0;
                let bar_y = response.rect.max.y - bar_h;
                let bar_w = response.rect.width();

                painter.rect_filled(
                    egui::Rect::from_min_size(
                        egui::pos2(response.rect.min.x, bar_y),
                        egui::vec2(bar_w, bar_h),
                    ),
                    0.0,
                    egui::Color32::from_rgba_premultiplied(0, 0, 0, 120),
                );
                if frac > 0.0 {
                    painter.rect_filled(
                        egui::Rect::from_min_size(
                            egui::pos2(response.rect.min.x, bar_y),
                            egui::vec2(bar_w * frac, bar_h),
                        ),
                        0.0,
                        egui::Color32::from_rgb(80, 200, 255),
                    );
                }
            }
        }

        self.handle_canvas_input(ctx, &response);
    }
}

// ---------------------------------------------------------------------------
// eframe::App
// ---------------------------------------------------------------------------

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui, ctx));

        self.handle_keyboard(ctx);
        self.show_hud(ctx);

        if self.needs_render || self.is_rendering() {
            ctx.request_repaint();
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.cancel();
        }
        self.store_preferences();
        info!("Saved preferences on exit");
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub(crate) fn run() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Mandelview");

    let prefs = AppPreferences::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Mandelview")
            .with_inner_size([prefs.window_width, prefs.window_height]),
        ..Default::default()
    };

    eframe::run_native(
        "Mandelview",
        options,
        Box::new(move |_cc| Ok(Box::new(ViewerApp::new(prefs)))),
    )
}
