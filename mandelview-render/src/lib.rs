pub mod band;
pub mod buffer;
pub mod error;
pub mod palette;
pub mod renderer;
pub mod worker;

pub use band::{partition_rows, Band};
pub use buffer::{BandWriter, PixelBuffer};
pub use error::RenderError;
pub use palette::{build_lut, map_iterations, ColorMode, Palette, CATALOG, DEFAULT_LUT_SIZE};
pub use renderer::{
    auto_iterations, effective_iterations, RenderCancel, RenderConfig, RenderPhase, RenderStatus,
    Renderer,
};
pub use worker::{Frame, START_STRIDE};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
