mod app;
mod app_dir;
mod hud;
mod input;
mod preferences;
mod render_bridge;

fn main() -> eframe::Result {
    app::run()
}
