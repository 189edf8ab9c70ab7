use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::band::partition_rows;
use crate::buffer::{BandWriter, PixelBuffer};
use crate::error::RenderError;
use crate::worker::{pass_count, BandOutcome, Frame, RenderTask, START_STRIDE};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cancellation flag shared by every worker of a generation.
///
/// The orchestrator raises the flag, waits for all workers to exit, then
/// lowers it before the next launch. The progress counters let the UI
/// display a progress bar.
#[derive(Debug)]
pub struct RenderCancel {
    cancelled: AtomicBool,
    progress_done: AtomicUsize,
    progress_total: AtomicUsize,
}

impl RenderCancel {
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            progress_done: AtomicUsize::new(0),
            progress_total: AtomicUsize::new(0),
        }
    }

    /// Ask all workers to stop at their next block boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Lower the flag. Only valid once every worker has exited.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
    }

    /// Reset progress for a new generation with `total` passes.
    pub fn reset_progress(&self, total: usize) {
        self.progress_total.store(total, Ordering::Relaxed);
        self.progress_done.store(0, Ordering::Relaxed);
    }

    /// Count one finished pass.
    pub fn inc_progress(&self) {
        self.progress_done.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the current progress as `(done, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_done.load(Ordering::Relaxed),
            self.progress_total.load(Ordering::Relaxed),
        )
    }
}

impl Default for RenderCancel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Iteration cap
// ---------------------------------------------------------------------------

/// Cap used when the zoom is not a usable positive number.
pub const FALLBACK_ITERATIONS: u32 = 5000;

/// Lowest auto-tuned cap.
pub const MIN_AUTO_ITERATIONS: u32 = 32;

/// Iteration cap for a zoom level: roughly 100 extra iterations per decade
/// of magnification, never below [`MIN_AUTO_ITERATIONS`].
pub fn auto_iterations(zoom: f64) -> u32 {
    if zoom <= 0.0 || !zoom.is_finite() {
        return FALLBACK_ITERATIONS;
    }
    let iter = 40.0 + 100.0 * (1.0 / zoom).log10();
    if iter < MIN_AUTO_ITERATIONS as f64 {
        MIN_AUTO_ITERATIONS
    } else {
        iter.min(u32::MAX as f64) as u32
    }
}

/// [`auto_iterations`] scaled by the user's multiplier, at least 1.
pub fn effective_iterations(zoom: f64, multiplier: f64) -> u32 {
    let scaled = auto_iterations(zoom) as f64 * multiplier;
    if !scaled.is_finite() || scaled < 1.0 {
        return 1;
    }
    scaled.min(u32::MAX as f64) as u32
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Renderer construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Worker count; 0 means one per logical core.
    pub workers: usize,
    /// Block size of the first pass.
    pub start_stride: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            start_stride: START_STRIDE,
        }
    }
}

/// Number of logical cores, at least 1.
pub fn logical_cores() -> usize {
    num_cpus::get().max(1)
}

/// Messages from band workers back to the orchestrator.
#[derive(Debug, Clone, Copy)]
enum WorkerEvent {
    Pass { generation: u64, stride: u32 },
    Exited {
        generation: u64,
        band_index: usize,
        outcome: BandOutcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// No workers running and nothing finished since the last cancel.
    Idle,
    Rendering,
    /// Every band of the current generation reached stride 1.
    Complete,
}

impl RenderPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Rendering => "Rendering\u{2026}",
            Self::Complete => "Done",
        }
    }
}

/// Snapshot of the orchestrator returned by [`Renderer::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStatus {
    pub phase: RenderPhase,
    pub generation: u64,
    pub passes_done: usize,
    pub passes_total: usize,
    /// At least one pass finished since the previous poll, so the buffer
    /// holds newly refined pixels worth presenting.
    pub frame_ready: bool,
    /// Wall time of the current generation (final once complete).
    pub elapsed: Duration,
}

/// Owns the worker pool, the pixel buffer and the cancellation flag, and
/// runs one generation at a time.
///
/// Any parameter change goes through [`render_generation`](Self::render_generation),
/// which cancels and drains the previous generation before launching the
/// next, so two generations never write the buffer concurrently.
pub struct Renderer {
    pool: rayon::ThreadPool,
    workers: usize,
    start_stride: u32,
    cancel: Arc<RenderCancel>,
    buffer: Arc<PixelBuffer>,
    tx: mpsc::Sender<WorkerEvent>,
    rx: mpsc::Receiver<WorkerEvent>,
    generation: u64,
    in_flight: usize,
    any_cancelled: bool,
    phase: RenderPhase,
    passes_done: usize,
    passes_total: usize,
    started: Instant,
    elapsed: Duration,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> crate::Result<Self> {
        let requested = if config.workers == 0 {
            logical_cores()
        } else {
            config.workers
        };
        let (pool, workers) = build_pool(requested)?;
        let (tx, rx) = mpsc::channel();
        info!(workers, "Render pool ready");

        Ok(Self {
            pool,
            workers,
            start_stride: config.start_stride.max(1).next_power_of_two(),
            cancel: Arc::new(RenderCancel::new()),
            buffer: Arc::new(PixelBuffer::new(0, 0)),
            tx,
            rx,
            generation: 0,
            in_flight: 0,
            any_cancelled: false,
            phase: RenderPhase::Idle,
            passes_done: 0,
            passes_total: 0,
            started: Instant::now(),
            elapsed: Duration::ZERO,
        })
    }

    /// Number of worker threads actually running.
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// The buffer of the current generation.
    pub fn buffer(&self) -> &Arc<PixelBuffer> {
        &self.buffer
    }

    /// Copy the current buffer contents out.
    pub fn snapshot(&self) -> Vec<u32> {
        self.buffer.snapshot()
    }

    /// Shared cancellation/progress handle, for progress display.
    pub fn cancel_handle(&self) -> &Arc<RenderCancel> {
        &self.cancel
    }

    /// Cancel whatever is running and start a new generation for `frame`.
    ///
    /// Blocks only while the previous generation's workers finish their
    /// current block. If the frame size differs from the buffer, the buffer
    /// is replaced after the drain. Returns the new generation id.
    pub fn render_generation(&mut self, frame: Frame) -> crate::Result<u64> {
        frame.viewport.validate()?;
        if frame.lut.is_empty() {
            return Err(RenderError::EmptyPalette);
        }

        self.drain();

        let (width, height) = (frame.viewport.width, frame.viewport.height);
        if self.buffer.width() != width || self.buffer.height() != height {
            debug!(width, height, "Reallocating pixel buffer");
            self.buffer = Arc::new(PixelBuffer::new(width, height));
        }

        self.generation += 1;
        let generation = self.generation;
        let frame = Arc::new(frame);
        let passes = pass_count(self.start_stride);

        let tasks: Vec<RenderTask> = partition_rows(height, self.workers)
            .into_iter()
            .enumerate()
            .filter(|(_, band)| !band.is_empty())
            .map(|(band_index, band)| RenderTask {
                generation,
                band_index,
                band,
                start_stride: self.start_stride,
                frame: Arc::clone(&frame),
            })
            .collect();

        self.in_flight = tasks.len();
        self.any_cancelled = false;
        self.passes_done = 0;
        self.passes_total = tasks.len() * passes;
        self.cancel.reset_progress(self.passes_total);
        self.phase = RenderPhase::Rendering;
        self.started = Instant::now();
        self.elapsed = Duration::ZERO;

        debug!(
            generation,
            bands = tasks.len(),
            width,
            height,
            max_iter = frame.viewport.max_iterations,
            zoom = frame.viewport.zoom,
            "Launching generation"
        );

        for task in tasks {
            let writer = BandWriter::new(Arc::clone(&self.buffer), task.band);
            let cancel = Arc::clone(&self.cancel);
            let tx = self.tx.clone();
            self.pool.spawn(move || {
                let outcome = task.run(&writer, &cancel, |stride| {
                    cancel.inc_progress();
                    let _ = tx.send(WorkerEvent::Pass {
                        generation: task.generation,
                        stride,
                    });
                });
                let _ = tx.send(WorkerEvent::Exited {
                    generation: task.generation,
                    band_index: task.band_index,
                    outcome,
                });
            });
        }

        Ok(generation)
    }

    /// Drain pending worker events without blocking.
    pub fn poll(&mut self) -> RenderStatus {
        let mut frame_ready = false;
        while let Ok(event) = self.rx.try_recv() {
            frame_ready |= self.apply(event);
        }
        self.status(frame_ready)
    }

    /// Block until the current generation has finished or been cancelled.
    pub fn wait(&mut self) -> RenderStatus {
        let mut frame_ready = false;
        while self.in_flight > 0 {
            match self.rx.recv() {
                Ok(event) => frame_ready |= self.apply(event),
                Err(_) => break,
            }
        }
        self.status(frame_ready)
    }

    /// Stop the current generation and wait for its workers to exit.
    pub fn cancel(&mut self) {
        if self.in_flight > 0 {
            info!(generation = self.generation, "Render cancelled");
        }
        self.drain();
        if self.phase == RenderPhase::Rendering {
            self.phase = RenderPhase::Idle;
        }
    }

    fn drain(&mut self) {
        if self.in_flight == 0 {
            return;
        }
        self.cancel.cancel();
        while self.in_flight > 0 {
            match self.rx.recv() {
                Ok(event) => {
                    self.apply(event);
                }
                Err(_) => break,
            }
        }
        self.cancel.reset();
        debug!(generation = self.generation, "Generation drained");
    }

    /// Fold one worker event into the orchestrator state. Returns `true`
    /// when the event means new pixels are in the buffer.
    fn apply(&mut self, event: WorkerEvent) -> bool {
        match event {
            WorkerEvent::Pass { generation, stride } => {
                if generation != self.generation {
                    return false;
                }
                self.passes_done += 1;
                debug!(generation, stride, done = self.passes_done, "Pass finished");
                true
            }
            WorkerEvent::Exited {
                generation,
                band_index,
                outcome,
            } => {
                if generation != self.generation {
                    return false;
                }
                if outcome == BandOutcome::Cancelled {
                    debug!(generation, band_index, "Band cancelled");
                }
                self.in_flight = self.in_flight.saturating_sub(1);
                self.any_cancelled |= outcome == BandOutcome::Cancelled;
                if self.in_flight == 0 {
                    self.elapsed = self.started.elapsed();
                    if self.any_cancelled {
                        self.phase = RenderPhase::Idle;
                    } else {
                        self.phase = RenderPhase::Complete;
                        info!(
                            generation,
                            elapsed_ms = self.elapsed.as_millis(),
                            workers = self.workers,
                            "Render complete"
                        );
                    }
                }
                false
            }
        }
    }

    fn status(&self, frame_ready: bool) -> RenderStatus {
        let elapsed = if self.phase == RenderPhase::Rendering {
            self.started.elapsed()
        } else {
            self.elapsed
        };
        RenderStatus {
            phase: self.phase,
            generation: self.generation,
            passes_done: self.passes_done,
            passes_total: self.passes_total,
            frame_ready,
            elapsed,
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.drain();
    }
}

/// Build the worker pool, halving the thread count on failure until a
/// single thread is tried.
fn build_pool(requested: usize) -> crate::Result<(rayon::ThreadPool, usize)> {
    with_fallback(requested, |workers| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("band-worker-{i}"))
            .build()
    })
    .map_err(|(workers, source)| RenderError::WorkerPool { workers, source })
}

/// Call `attempt` with `requested` workers, then half as many after each
/// failure. Returns the first success with its worker count, or the error
/// of the single-worker attempt.
fn with_fallback<T, E: std::fmt::Display>(
    requested: usize,
    mut attempt: impl FnMut(usize) -> Result<T, E>,
) -> Result<(T, usize), (usize, E)> {
    let mut workers = requested.max(1);
    loop {
        match attempt(workers) {
            Ok(value) => return Ok((value, workers)),
            Err(e) if workers == 1 => return Err((workers, e)),
            Err(e) => {
                let fallback = (workers / 2).max(1);
                warn!(workers, fallback, "Failed to start worker pool: {e}");
                workers = fallback;
            }
        }
    }
}
