use std::sync::Arc;

use mandelview_core::{escape_time, Viewport};

use crate::band::Band;
use crate::buffer::BandWriter;
use crate::palette::{map_iterations, ColorMode, Palette};
use crate::renderer::RenderCancel;

/// Block size of the first (coarsest) refinement pass.
pub const START_STRIDE: u32 = 16;

/// Everything a generation reads: an immutable snapshot taken by the
/// orchestrator before launch.
#[derive(Debug, Clone)]
pub struct Frame {
    pub viewport: Viewport,
    pub lut: Arc<[u32]>,
    pub mode: ColorMode,
}

impl Frame {
    pub fn new(viewport: Viewport, palette: &Palette, mode: ColorMode) -> Self {
        Self {
            viewport,
            lut: Arc::clone(palette.lut()),
            mode,
        }
    }

    /// Color of a single pixel at full resolution.
    #[inline]
    pub fn shade(&self, px: u32, py: u32) -> u32 {
        let max_iter = self.viewport.max_iterations;
        let n = escape_time(self.viewport.pixel_to_complex(px, py), max_iter);
        map_iterations(&self.lut, n, max_iter, self.mode)
    }
}

/// How a band's work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandOutcome {
    Completed,
    Cancelled,
}

/// Strides visited by a progressive render starting at `start`:
/// `start, start/2, …, 1`. `start` is rounded up to a power of two.
pub fn stride_schedule(start: u32) -> impl Iterator<Item = u32> {
    let start = start.max(1).next_power_of_two();
    std::iter::successors(Some(start), |&s| (s > 1).then_some(s / 2))
}

/// Number of passes in [`stride_schedule`].
pub fn pass_count(start: u32) -> usize {
    stride_schedule(start).count()
}

/// One worker's share of a generation.
#[derive(Debug, Clone)]
pub struct RenderTask {
    pub generation: u64,
    pub band_index: usize,
    pub band: Band,
    pub start_stride: u32,
    pub frame: Arc<Frame>,
}

impl RenderTask {
    /// Progressively render the writer's band.
    ///
    /// Each pass samples every `s`-th column of every `s`-th row (relative
    /// to the band start), paints an `s × s` block per sample and halves
    /// `s` until it reaches 1. Samples already evaluated by a coarser pass
    /// are skipped since their block already holds the right color.
    /// `on_pass` is called with the stride after each completed pass.
    pub fn run(
        &self,
        writer: &BandWriter,
        cancel: &RenderCancel,
        mut on_pass: impl FnMut(u32),
    ) -> BandOutcome {
        let band = writer.band();
        let width = self.frame.viewport.width.min(writer.width());
        let first = self.start_stride.max(1).next_power_of_two();

        for stride in stride_schedule(first) {
            let coarser = stride * 2;
            let mut y = band.start_y;
            while y < band.end_y {
                let row_seen = stride < first && (y - band.start_y) % coarser == 0;

                let mut x = 0;
                while x < width {
                    if cancel.is_cancelled() {
                        return BandOutcome::Cancelled;
                    }
                    if !(row_seen && x % coarser == 0) {
                        writer.fill_run(x, y, stride, self.frame.shade(x, y));
                    }
                    x += stride;
                }

                if stride > 1 {
                    if cancel.is_cancelled() {
                        return BandOutcome::Cancelled;
                    }
                    writer.copy_row_down(y, stride - 1);
                }
                y += stride;
            }
            on_pass(stride);
        }
        BandOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PixelBuffer;
    use mandelview_core::Complex;

    fn frame(width: u32, height: u32) -> Arc<Frame> {
        let viewport = Viewport::new(width, height, Complex::new(-0.6, 0.1), 0.04, 200).unwrap();
        Arc::new(Frame::new(viewport, &Palette::default(), ColorMode::Cyclic))
    }

    fn reference(frame: &Frame) -> Vec<u32> {
        let vp = &frame.viewport;
        (0..vp.height)
            .flat_map(|y| (0..vp.width).map(move |x| (x, y)))
            .map(|(x, y)| frame.shade(x, y))
            .collect()
    }

    #[test]
    fn schedule_halves_to_one() {
        assert_eq!(stride_schedule(16).collect::<Vec<_>>(), vec![16, 8, 4, 2, 1]);
        assert_eq!(stride_schedule(12).collect::<Vec<_>>(), vec![16, 8, 4, 2, 1]);
        assert_eq!(stride_schedule(1).collect::<Vec<_>>(), vec![1]);
        assert_eq!(stride_schedule(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(pass_count(START_STRIDE), 5);
    }

    #[test]
    fn single_band_matches_per_pixel_reference() {
        let frame = frame(53, 37);
        let buf = Arc::new(PixelBuffer::new(53, 37));
        let band = Band::new(0, 37);
        let task = RenderTask {
            generation: 1,
            band_index: 0,
            band,
            start_stride: START_STRIDE,
            frame: Arc::clone(&frame),
        };
        let mut passes = Vec::new();
        let outcome = task.run(
            &BandWriter::new(Arc::clone(&buf), band),
            &RenderCancel::new(),
            |s| passes.push(s),
        );
        assert_eq!(outcome, BandOutcome::Completed);
        assert_eq!(passes, vec![16, 8, 4, 2, 1]);
        assert_eq!(buf.snapshot(), reference(&frame));
    }

    #[test]
    fn coarse_pass_fills_blocks() {
        let frame = frame(32, 32);
        let buf = Arc::new(PixelBuffer::new(32, 32));
        let band = Band::new(0, 32);
        let task = RenderTask {
            generation: 1,
            band_index: 0,
            band,
            start_stride: 16,
            frame: Arc::clone(&frame),
        };
        let cancel = RenderCancel::new();
        let mut after_first = None;
        task.run(&BandWriter::new(Arc::clone(&buf), band), &cancel, |s| {
            if s == 16 {
                after_first = Some(buf.snapshot());
                cancel.cancel();
            }
        });
        let snap = after_first.unwrap();
        for (by, bx) in [(0, 0), (0, 16), (16, 0), (16, 16)] {
            let expected = frame.shade(bx, by);
            for y in by..by + 16 {
                for x in bx..bx + 16 {
                    assert_eq!(snap[(y * 32 + x) as usize], expected, "pixel ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn cancelled_task_stops_without_finishing() {
        let frame = frame(64, 64);
        let buf = Arc::new(PixelBuffer::new(64, 64));
        let band = Band::new(0, 64);
        let task = RenderTask {
            generation: 1,
            band_index: 0,
            band,
            start_stride: 16,
            frame,
        };
        let cancel = RenderCancel::new();
        cancel.cancel();
        let mut passes = 0;
        let outcome = task.run(&BandWriter::new(Arc::clone(&buf), band), &cancel, |_| passes += 1);
        assert_eq!(outcome, BandOutcome::Cancelled);
        assert_eq!(passes, 0);
        assert!(buf.snapshot().iter().all(|&c| c == crate::palette::OPAQUE));
    }

    #[test]
    fn band_offset_does_not_touch_other_rows() {
        let frame = frame(20, 30);
        let buf = Arc::new(PixelBuffer::new(20, 30));
        let band = Band::new(7, 19);
        let task = RenderTask {
            generation: 1,
            band_index: 1,
            band,
            start_stride: 16,
            frame: Arc::clone(&frame),
        };
        task.run(&BandWriter::new(Arc::clone(&buf), band), &RenderCancel::new(), |_| {});
        let expected = reference(&frame);
        let snap = buf.snapshot();
        for y in 0..30usize {
            for x in 0..20usize {
                let i = y * 20 + x;
                if (7..19).contains(&y) {
                    assert_eq!(snap[i], expected[i], "pixel ({x}, {y})");
                } else {
                    assert_eq!(snap[i], crate::palette::OPAQUE, "pixel ({x}, {y}) outside band");
                }
            }
        }
    }
}
