use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::complex::Complex;
use crate::error::CoreError;

/// Smallest zoom the viewport will accept when clamping.
///
/// Far below anything f64 can resolve meaningfully, but keeps the affine
/// mapping non-degenerate.
pub const MIN_ZOOM: f64 = 1e-300;

/// Largest zoom the viewport will accept when clamping. The whole set fits
/// on screen long before this.
pub const MAX_ZOOM: f64 = 1e3;

/// Wheel sensitivity: each notch scales the zoom by `1 ± 0.25`.
pub const ZOOM_INTENSITY: f64 = 0.25;

/// Mouse-drag bookkeeping for click-and-drag panning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragState {
    pub active: bool,
    /// Screen point where the drag started.
    pub anchor_x: f64,
    pub anchor_y: f64,
    /// Offset at the moment the drag started.
    pub start_offset: Complex,
}

/// The visible region of the complex plane plus the iteration cap.
///
/// Pixels map to the plane by `offset + (pixel − half_extent) × zoom`, so
/// `offset` is the plane point under the screen centre. The y-axis is not
/// flipped: increasing pixel-y increases the imaginary part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Viewport width in pixels.
    pub width: u32,

    /// Viewport height in pixels.
    pub height: u32,

    /// Complex-plane units per pixel.
    pub zoom: f64,

    /// Complex-plane point at the centre of the screen.
    pub offset: Complex,

    /// Iteration cap handed to the escape evaluator.
    pub max_iterations: u32,

    #[serde(skip)]
    pub drag: DragState,
}

impl Viewport {
    pub const DEFAULT_OFFSET: Complex = Complex { re: -0.72, im: 0.0 };
    pub const DEFAULT_ZOOM: f64 = 0.0032;
    pub const DEFAULT_MAX_ITERATIONS: u32 = 64;

    /// Opening view: the whole set framed on a 1280×720 screen.
    pub fn default_view(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            zoom: Self::DEFAULT_ZOOM,
            offset: Self::DEFAULT_OFFSET,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            drag: DragState::default(),
        }
    }

    /// Create a viewport with explicit parameters.
    pub fn new(
        width: u32,
        height: u32,
        offset: Complex,
        zoom: f64,
        max_iterations: u32,
    ) -> crate::Result<Self> {
        let vp = Self {
            width,
            height,
            zoom,
            offset,
            max_iterations,
            drag: DragState::default(),
        };
        vp.validate()?;
        Ok(vp)
    }

    /// Check the invariants the renderer relies on.
    pub fn validate(&self) -> crate::Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CoreError::InvalidViewport {
                reason: format!("dimensions must be > 0, got {}×{}", self.width, self.height),
            });
        }
        if self.zoom <= 0.0 || !self.zoom.is_finite() {
            return Err(CoreError::InvalidZoom(self.zoom));
        }
        if self.max_iterations == 0 {
            return Err(CoreError::InvalidMaxIterations(self.max_iterations));
        }
        if !self.offset.re.is_finite() || !self.offset.im.is_finite() {
            return Err(CoreError::InvalidViewport {
                reason: format!("offset must be finite, got {}", self.offset),
            });
        }
        Ok(())
    }

    /// Map a pixel coordinate to a point on the complex plane.
    #[inline]
    pub fn pixel_to_complex(&self, px: u32, py: u32) -> Complex {
        self.screen_to_complex(px as f64, py as f64)
    }

    /// Map fractional screen coordinates (e.g. a mouse position).
    #[inline]
    pub fn screen_to_complex(&self, sx: f64, sy: f64) -> Complex {
        let half_w = self.width as f64 * 0.5;
        let half_h = self.height as f64 * 0.5;
        Complex::new(
            self.offset.re + (sx - half_w) * self.zoom,
            self.offset.im + (sy - half_h) * self.zoom,
        )
    }

    /// Pixel count of the full frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Set the iteration cap, clamped to at least 1.
    pub fn set_max_iterations(&mut self, max_iterations: u32) {
        self.max_iterations = max_iterations.max(1);
    }

    /// Change the screen size. Returns `true` if the size actually changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let (w, h) = (width.max(1), height.max(1));
        if w == self.width && h == self.height {
            return false;
        }
        debug!(from_w = self.width, from_h = self.height, w, h, "Viewport resized");
        self.width = w;
        self.height = h;
        true
    }

    // -- Panning --

    pub fn begin_drag(&mut self, sx: f64, sy: f64) {
        self.drag = DragState {
            active: true,
            anchor_x: sx,
            anchor_y: sy,
            start_offset: self.offset,
        };
    }

    /// Move the view so the plane point under the drag anchor follows the
    /// cursor. Returns `true` if the offset changed.
    pub fn drag_to(&mut self, sx: f64, sy: f64) -> bool {
        if !self.drag.active {
            return false;
        }
        let delta = Complex::new(sx - self.drag.anchor_x, sy - self.drag.anchor_y);
        let offset = self.drag.start_offset - delta * self.zoom;
        let changed = offset != self.offset;
        self.offset = offset;
        changed
    }

    pub fn end_drag(&mut self) {
        self.drag.active = false;
    }

    // -- Zooming --

    /// Multiply the zoom by `factor`, keeping the plane point under
    /// `(sx, sy)` fixed on screen. Non-positive or non-finite factors are
    /// ignored; the result is clamped to `[MIN_ZOOM, MAX_ZOOM]`. Returns
    /// `false` and leaves the view untouched if nothing changed or the new
    /// offset would not be finite.
    pub fn zoom_about(&mut self, sx: f64, sy: f64, factor: f64) -> bool {
        if factor <= 0.0 || !factor.is_finite() || factor == 1.0 {
            return false;
        }
        let rel = Complex::new(sx - self.width as f64 * 0.5, sy - self.height as f64 * 0.5);
        let anchor = self.offset + rel * self.zoom;

        let zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let offset = anchor - rel * zoom;
        if !offset.re.is_finite() || !offset.im.is_finite() {
            return false;
        }
        if zoom == self.zoom && offset == self.offset {
            return false;
        }
        self.zoom = zoom;
        self.offset = offset;
        true
    }

    /// Apply mouse-wheel notches at a screen point. Positive `notches`
    /// zoom in.
    pub fn wheel_zoom(&mut self, sx: f64, sy: f64, notches: f64) -> bool {
        let factor = if notches > 0.0 {
            1.0 / (1.0 + notches * ZOOM_INTENSITY)
        } else if notches < 0.0 {
            1.0 - notches * ZOOM_INTENSITY
        } else {
            return false;
        };
        self.zoom_about(sx, sy, factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn default_view_matches_opening_frame() {
        let vp = Viewport::default_view(1280, 720);
        assert_eq!(vp.width, 1280);
        assert_eq!(vp.height, 720);
        assert!((vp.offset.re - (-0.72)).abs() < EPSILON);
        assert!((vp.zoom - 0.0032).abs() < EPSILON);
        assert_eq!(vp.max_iterations, 64);
        assert!(vp.validate().is_ok());
    }

    #[test]
    fn pixel_to_complex_center_is_offset() {
        let vp = Viewport::new(100, 100, Complex::new(0.5, -0.25), 0.01, 64).unwrap();
        let c = vp.pixel_to_complex(50, 50);
        assert!((c.re - 0.5).abs() < EPSILON);
        assert!((c.im - (-0.25)).abs() < EPSILON);
    }

    #[test]
    fn pixel_to_complex_corners() {
        let vp = Viewport::new(100, 100, Complex::ZERO, 1.0, 64).unwrap();

        let tl = vp.pixel_to_complex(0, 0);
        assert!((tl.re - (-50.0)).abs() < EPSILON);
        assert!((tl.im - (-50.0)).abs() < EPSILON);

        let br = vp.pixel_to_complex(99, 99);
        assert!((br.re - 49.0).abs() < EPSILON);
        assert!((br.im - 49.0).abs() < EPSILON);
    }

    #[test]
    fn invalid_configuration_rejected() {
        assert!(Viewport::new(0, 100, Complex::ZERO, 0.01, 64).is_err());
        assert!(Viewport::new(100, 0, Complex::ZERO, 0.01, 64).is_err());
        assert!(Viewport::new(100, 100, Complex::ZERO, 0.0, 64).is_err());
        assert!(Viewport::new(100, 100, Complex::ZERO, -1.0, 64).is_err());
        assert!(Viewport::new(100, 100, Complex::ZERO, f64::NAN, 64).is_err());
        assert!(Viewport::new(100, 100, Complex::ZERO, 0.01, 0).is_err());
        assert!(Viewport::new(100, 100, Complex::new(f64::INFINITY, 0.0), 0.01, 8).is_err());
    }

    #[test]
    fn iteration_cap_clamped() {
        let mut vp = Viewport::default_view(10, 10);
        vp.set_max_iterations(0);
        assert_eq!(vp.max_iterations, 1);
    }

    #[test]
    fn drag_pans_against_cursor() {
        let mut vp = Viewport::new(200, 100, Complex::ZERO, 0.5, 64).unwrap();
        vp.begin_drag(10.0, 10.0);
        assert!(vp.drag_to(30.0, 0.0));
        assert!((vp.offset.re - (-10.0)).abs() < EPSILON);
        assert!((vp.offset.im - 5.0).abs() < EPSILON);
        vp.end_drag();
        assert!(!vp.drag_to(100.0, 100.0));
        assert!((vp.offset.re - (-10.0)).abs() < EPSILON);
    }

    #[test]
    fn wheel_zoom_keeps_cursor_point_fixed() {
        let mut vp = Viewport::default_view(1280, 720);
        let before = vp.screen_to_complex(900.0, 200.0);
        assert!(vp.wheel_zoom(900.0, 200.0, 1.0));
        assert!((vp.zoom - 0.0032 / 1.25).abs() < 1e-15);
        let after = vp.screen_to_complex(900.0, 200.0);
        assert!((before.re - after.re).abs() < EPSILON);
        assert!((before.im - after.im).abs() < EPSILON);

        assert!(vp.wheel_zoom(900.0, 200.0, -2.0));
        assert!((vp.zoom - 0.0032 / 1.25 * 1.5).abs() < 1e-15);
    }

    #[test]
    fn zoom_never_reaches_zero() {
        let mut vp = Viewport::default_view(64, 64);
        for _ in 0..10_000 {
            vp.zoom_about(32.0, 32.0, 1e-10);
        }
        assert!(vp.zoom >= MIN_ZOOM);
        assert!(vp.validate().is_ok());
        assert!(!vp.zoom_about(0.0, 0.0, -2.0));
    }

    #[test]
    fn zoom_out_stays_bounded() {
        let mut vp = Viewport::default_view(1280, 720);
        for _ in 0..4000 {
            vp.wheel_zoom(10.0, 10.0, -1.0);
        }
        assert!(vp.validate().is_ok());
        assert_eq!(vp.zoom, MAX_ZOOM);
        assert!(vp.offset.re.is_finite() && vp.offset.im.is_finite());
    }

    #[test]
    fn resize_reports_change() {
        let mut vp = Viewport::default_view(64, 48);
        assert!(!vp.resize(64, 48));
        assert!(vp.resize(32, 0));
        assert_eq!((vp.width, vp.height), (32, 1));
    }

    #[test]
    fn serde_round_trip_skips_drag() {
        let mut vp = Viewport::default_view(320, 200);
        vp.begin_drag(1.0, 2.0);
        let json = serde_json::to_string(&vp).unwrap();
        let back: Viewport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.offset, vp.offset);
        assert_eq!(back.max_iterations, vp.max_iterations);
        assert!(!back.drag.active);
    }
}
