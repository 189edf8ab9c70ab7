use thiserror::Error;

/// Errors originating from the rendering pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("palette needs at least one anchor color")]
    EmptyPalette,

    #[error("invalid palette size: {0} (must be >= 1)")]
    InvalidPaletteSize(usize),

    #[error("could not start a worker pool (last attempt with {workers} threads): {source}")]
    WorkerPool {
        workers: usize,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    #[error(transparent)]
    Core(#[from] mandelview_core::CoreError),
}
