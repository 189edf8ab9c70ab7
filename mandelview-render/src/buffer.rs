use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::band::Band;
use crate::palette::{channels, OPAQUE};

/// A packed `0xFFRRGGBB` pixel buffer shared between the orchestrator and
/// the workers of one generation.
///
/// Cells are `AtomicU32` written with relaxed stores: bands never overlap,
/// so no two workers touch the same cell, and the presentation side may read
/// a half-refined frame at any time without locking.
#[derive(Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    cells: Box<[AtomicU32]>,
}

impl PixelBuffer {
    /// Create a new buffer filled with opaque black.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        let cells = (0..len).map(|_| AtomicU32::new(OPAQUE)).collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read one pixel, or `None` outside the buffer.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[self.index(x, y)].load(Ordering::Relaxed))
    }

    /// Copy the current contents out as packed pixels, row-major.
    pub fn snapshot(&self) -> Vec<u32> {
        self.cells.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }

    /// Copy the current contents out as RGBA bytes for texture upload.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.cells.len() * 4);
        for cell in self.cells.iter() {
            let [r, g, b] = channels(cell.load(Ordering::Relaxed));
            out.extend_from_slice(&[r, g, b, 255]);
        }
        out
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    fn store(&self, index: usize, color: u32) {
        self.cells[index].store(color, Ordering::Relaxed);
    }
}

/// Write access to one band of a [`PixelBuffer`].
///
/// Every write is range-checked against both the band and the buffer's
/// dimensions; anything outside is dropped.
#[derive(Debug, Clone)]
pub struct BandWriter {
    buffer: Arc<PixelBuffer>,
    band: Band,
}

impl BandWriter {
    /// The band is clipped to the buffer height.
    pub fn new(buffer: Arc<PixelBuffer>, band: Band) -> Self {
        let height = buffer.height();
        let band = Band::new(band.start_y.min(height), band.end_y.min(height));
        Self { buffer, band }
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Fill `len` pixels of row `y` starting at column `x`, clipped to the
    /// buffer width. Returns the number of pixels written.
    pub fn fill_run(&self, x: u32, y: u32, len: u32, color: u32) -> u32 {
        debug_assert!(self.band.contains(y), "row {y} outside {:?}", self.band);
        if !self.band.contains(y) || x >= self.buffer.width() {
            return 0;
        }
        let end = x.saturating_add(len).min(self.buffer.width());
        let start = self.buffer.index(x, y);
        for i in 0..(end - x) as usize {
            self.buffer.store(start + i, color);
        }
        end - x
    }

    /// Copy row `y` onto the `count` rows beneath it, stopping at the end
    /// of the band. Returns the number of rows written.
    pub fn copy_row_down(&self, y: u32, count: u32) -> u32 {
        if !self.band.contains(y) || count == 0 {
            return 0;
        }
        let last = y.saturating_add(count).min(self.band.end_y - 1);
        if last <= y {
            return 0;
        }
        let width = self.buffer.width() as usize;
        let src = self.buffer.index(0, y);
        for dst_y in y + 1..=last {
            let dst = self.buffer.index(0, dst_y);
            for i in 0..width {
                let color = self.buffer.cells[src + i].load(Ordering::Relaxed);
                self.buffer.store(dst + i, color);
            }
        }
        last - y
    }
}
