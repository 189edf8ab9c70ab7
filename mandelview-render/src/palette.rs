use std::sync::Arc;

use tracing::debug;

use crate::error::RenderError;

/// Default number of entries in a palette lookup table.
pub const DEFAULT_LUT_SIZE: usize = 2048;

/// Cyclic mode advances this many palette entries per iteration.
pub const CYCLE_FREQUENCY: u64 = 8;

/// Alpha bits of a packed `0xAARRGGBB` color; every color we emit is opaque.
pub const OPAQUE: u32 = 0xFF00_0000;

// ---------------------------------------------------------------------------
// Packed colors
// ---------------------------------------------------------------------------

/// Pack an opaque `0xFFRRGGBB` color.
#[inline]
pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    OPAQUE | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Unpack the `[r, g, b]` channels of a packed color.
#[inline]
pub const fn channels(color: u32) -> [u8; 3] {
    [(color >> 16) as u8, (color >> 8) as u8, color as u8]
}

/// Blend two packed colors per channel, rounding to nearest.
///
/// `t` is clamped to `[0, 1]`; the result is always opaque.
pub fn lerp_color(a: u32, b: u32, t: f64) -> u32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let [r1, g1, b1] = channels(a);
    let [r2, g2, b2] = channels(b);
    let mix = |x: u8, y: u8| -> u8 {
        let v = (1.0 - t) * x as f64 + t * y as f64 + 0.5;
        v.clamp(0.0, 255.0) as u8
    };
    rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
}

/// Build a lookup table of `steps` colors by walking evenly across the
/// anchors and blending between consecutive pairs.
pub fn build_lut(anchors: &[u32], steps: usize) -> crate::Result<Vec<u32>> {
    if anchors.is_empty() {
        return Err(RenderError::EmptyPalette);
    }
    if steps == 0 {
        return Err(RenderError::InvalidPaletteSize(steps));
    }

    let last = anchors.len() - 1;
    let lut = (0..steps)
        .map(|i| {
            let p = if steps == 1 {
                0.0
            } else {
                i as f64 / (steps - 1) as f64
            };
            let pos = p * last as f64;
            let idx1 = (pos.floor() as usize).min(last);
            let idx2 = (idx1 + 1).min(last);
            lerp_color(anchors[idx1], anchors[idx2], pos - idx1 as f64)
        })
        .collect();
    Ok(lut)
}

// ---------------------------------------------------------------------------
// Color mapping
// ---------------------------------------------------------------------------

/// How iteration counts are turned into palette indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// `(iterations × CYCLE_FREQUENCY) mod len`; the palette repeats.
    #[default]
    Cyclic,
    /// `iterations × (len − 1) / cap`; one sweep across the whole cap.
    Linear,
}

impl ColorMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Cyclic => Self::Linear,
            Self::Linear => Self::Cyclic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cyclic => "Cyclic",
            Self::Linear => "Linear",
        }
    }
}

/// Pick the LUT entry for an escape count.
///
/// Points that reached the cap use entry 0 in both modes.
#[inline]
pub fn map_iterations(lut: &[u32], iterations: u32, max_iterations: u32, mode: ColorMode) -> u32 {
    let len = lut.len();
    if len == 0 {
        return OPAQUE;
    }
    if iterations >= max_iterations {
        return lut[0];
    }
    let index = match mode {
        ColorMode::Cyclic => (iterations as u64 * CYCLE_FREQUENCY % len as u64) as usize,
        ColorMode::Linear => {
            (iterations as u64 * (len as u64 - 1) / max_iterations.max(1) as u64) as usize
        }
    };
    lut[index.min(len - 1)]
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// A named set of anchors and the lookup table derived from them.
///
/// The table sits behind an `Arc` so a generation in flight keeps reading
/// its own copy while a new palette is built; tables are never mutated.
#[derive(Debug, Clone)]
pub struct Palette {
    pub name: &'static str,
    anchors: Vec<u32>,
    lut: Arc<[u32]>,
}

impl Palette {
    pub fn new(name: &'static str, anchors: &[u32], steps: usize) -> crate::Result<Self> {
        let lut = build_lut(anchors, steps)?;
        debug!(name, anchors = anchors.len(), steps, "Built palette");
        Ok(Self {
            name,
            anchors: anchors.to_vec(),
            lut: lut.into(),
        })
    }

    /// Build the catalog entry at `index` (wrapping).
    pub fn from_catalog(index: usize, steps: usize) -> crate::Result<Self> {
        let set = &CATALOG[index % CATALOG.len()];
        Self::new(set.name, &set.anchors, steps)
    }

    /// Rebuild the same anchors at a different table size.
    pub fn with_steps(&self, steps: usize) -> crate::Result<Self> {
        Self::new(self.name, &self.anchors, steps)
    }

    pub fn anchors(&self) -> &[u32] {
        &self.anchors
    }

    pub fn lut(&self) -> &Arc<[u32]> {
        &self.lut
    }

    pub fn len(&self) -> usize {
        self.lut.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lut.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        let set = &CATALOG[0];
        // Catalog anchors are non-empty and the size is non-zero.
        let lut: Arc<[u32]> = build_lut(&set.anchors, DEFAULT_LUT_SIZE)
            .unwrap_or_else(|_| vec![OPAQUE])
            .into();
        Self {
            name: set.name,
            anchors: set.anchors.to_vec(),
            lut,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A named list of eight anchor colors.
#[derive(Debug, Clone, Copy)]
pub struct AnchorSet {
    pub name: &'static str,
    pub anchors: [u32; 8],
}

pub const CATALOG: [AnchorSet; 12] = [
    AnchorSet {
        name: "Inferno",
        anchors: [0xFF000000, 0xFF07002B, 0xFF2A005E, 0xFF7C0000, 0xFFFF0000, 0xFFFF8000, 0xFFFFFF00, 0xFFFFFFFF],
    },
    AnchorSet {
        name: "Psychedelic",
        anchors: [0xFF000000, 0xFF8900FF, 0xFF0022FF, 0xFF00CCFF, 0xFF00FF00, 0xFFFFFF00, 0xFFFF0000, 0xFFFFFFFF],
    },
    AnchorSet {
        name: "Rainbow",
        anchors: [0xFFFF0000, 0xFFFF8000, 0xFFFFFF00, 0xFF00FF00, 0xFF00FFFF, 0xFF0000FF, 0xFF8000FF, 0xFFFF0080],
    },
    AnchorSet {
        name: "Vaporwave",
        anchors: [0xFF200050, 0xFF600090, 0xFFC04080, 0xFFFF60B0, 0xFF00E0FF, 0xFF80FFC0, 0xFFFFFF80, 0xFF5000A0],
    },
    AnchorSet {
        name: "Stripey",
        anchors: [0xFF000000, 0xFFFFFFFF, 0xFF000000, 0xFFFFFFFF, 0xFF000000, 0xFFFFFFFF, 0xFF000000, 0xFFFFFFFF],
    },
    AnchorSet {
        name: "Fire & Ice",
        anchors: [0xFF000040, 0xFF0000FF, 0xFF0080FF, 0xFF80FFFF, 0xFF400000, 0xFFFF0000, 0xFFFF8000, 0xFFFFFF00],
    },
    AnchorSet {
        name: "CGA High",
        anchors: [0xFF000000, 0xFFFF5555, 0xFF55FFFF, 0xFFFFFFFF, 0xFF0000AA, 0xFFAA00AA, 0xFF00AAAA, 0xFFAAAAAA],
    },
    AnchorSet {
        name: "Alien Goo",
        anchors: [0xFF100000, 0xFF400020, 0xFF600000, 0xFF804000, 0xFF006000, 0xFF00FF00, 0xFF80FF00, 0xFFCCFFCC],
    },
    AnchorSet {
        name: "Midnight Gold",
        anchors: [0xFF000000, 0xFF101030, 0xFF000060, 0xFF402010, 0xFF806020, 0xFFD0A040, 0xFFFFF0A0, 0xFF202040],
    },
    AnchorSet {
        name: "Neon Chaos",
        anchors: [0xFF000000, 0xFFFF00FF, 0xFF000000, 0xFF00FFFF, 0xFF000000, 0xFF00FF00, 0xFF000000, 0xFFFFFF00],
    },
    AnchorSet {
        name: "CMYK",
        anchors: [0xFF000000, 0xFF00FFFF, 0xFF0080FF, 0xFFFF00FF, 0xFFFF0080, 0xFFFFFF00, 0xFF808080, 0xFFFFFFFF],
    },
    AnchorSet {
        name: "Halloween",
        anchors: [0xFF000000, 0xFF220044, 0xFF440088, 0xFF6600CC, 0xFF8800FF, 0xFFFF6600, 0xFFFF9900, 0xFFFFFFFF],
    },
];

/// Index of the catalog entry after `index`, wrapping at the end.
pub fn advance(index: usize) -> usize {
    (index + 1) % CATALOG.len()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: u32 = 0xFF000000;
    const WHITE: u32 = 0xFFFFFFFF;

    #[test]
    fn black_to_white_midpoint() {
        let lut = build_lut(&[BLACK, WHITE], 3).unwrap();
        // 127.5 + 0.5 truncates to 128.
        assert_eq!(lut, vec![BLACK, 0xFF808080, WHITE]);
    }

    #[test]
    fn single_step_uses_first_anchor() {
        let lut = build_lut(&[0xFF123456, WHITE], 1).unwrap();
        assert_eq!(lut, vec![0xFF123456]);
    }

    #[test]
    fn endpoints_hit_first_and_last_anchor() {
        for set in CATALOG.iter() {
            let lut = build_lut(&set.anchors, DEFAULT_LUT_SIZE).unwrap();
            assert_eq!(lut.len(), DEFAULT_LUT_SIZE);
            assert_eq!(lut[0], set.anchors[0], "{}", set.name);
            assert_eq!(lut[DEFAULT_LUT_SIZE - 1], set.anchors[7], "{}", set.name);
            assert!(lut.iter().all(|&c| c & OPAQUE == OPAQUE), "{}", set.name);
        }
    }

    #[test]
    fn anchors_land_on_segment_boundaries() {
        // 8 anchors over 8 steps: every step is exactly one anchor.
        let set = &CATALOG[1];
        let lut = build_lut(&set.anchors, 8).unwrap();
        assert_eq!(lut.as_slice(), &set.anchors);
    }

    #[test]
    fn alpha_forced_opaque() {
        let lut = build_lut(&[0x00000000, 0x00FFFFFF], 4).unwrap();
        assert!(lut.iter().all(|&c| c >> 24 == 0xFF));
    }

    #[test]
    fn invalid_inputs_rejected() {
        assert!(matches!(build_lut(&[], 16), Err(RenderError::EmptyPalette)));
        assert!(matches!(
            build_lut(&[BLACK], 0),
            Err(RenderError::InvalidPaletteSize(0))
        ));
    }

    #[test]
    fn advance_wraps_catalog() {
        assert_eq!(advance(0), 1);
        assert_eq!(advance(CATALOG.len() - 1), 0);
        let mut idx = 0;
        for _ in 0..CATALOG.len() {
            idx = advance(idx);
        }
        assert_eq!(idx, 0);
    }

    #[test]
    fn switching_palette_leaves_old_table_intact() {
        let a = Palette::from_catalog(0, 64).unwrap();
        let held = Arc::clone(a.lut());
        let b = Palette::from_catalog(advance(0), 64).unwrap();
        assert_ne!(a.lut(), b.lut());
        assert_eq!(&held, a.lut());
        assert_eq!(b.name, "Psychedelic");
    }

    #[test]
    fn with_steps_keeps_anchors() {
        let p = Palette::from_catalog(5, 32).unwrap();
        let q = p.with_steps(128).unwrap();
        assert_eq!(q.len(), 128);
        assert_eq!(p.anchors(), q.anchors());
        assert_eq!(q.name, p.name);
    }

    #[test]
    fn bounded_points_use_first_entry() {
        let lut: Vec<u32> = (0..16).map(|i| rgb(i as u8, 0, 0)).collect();
        assert_eq!(map_iterations(&lut, 100, 100, ColorMode::Cyclic), lut[0]);
        assert_eq!(map_iterations(&lut, 100, 100, ColorMode::Linear), lut[0]);
    }

    #[test]
    fn cyclic_mapping_wraps() {
        let lut: Vec<u32> = (0..16).map(|i| rgb(i as u8, 0, 0)).collect();
        // 3 × 8 = 24 ≡ 8 (mod 16)
        assert_eq!(map_iterations(&lut, 3, 1000, ColorMode::Cyclic), lut[8]);
        assert_eq!(map_iterations(&lut, 2, 1000, ColorMode::Cyclic), lut[0]);
    }

    #[test]
    fn linear_mapping_is_proportional() {
        let lut: Vec<u32> = (0..16).map(|i| rgb(i as u8, 0, 0)).collect();
        assert_eq!(map_iterations(&lut, 0, 100, ColorMode::Linear), lut[0]);
        assert_eq!(map_iterations(&lut, 50, 100, ColorMode::Linear), lut[7]);
        assert_eq!(map_iterations(&lut, 99, 100, ColorMode::Linear), lut[14]);
    }

    #[test]
    fn mode_toggle() {
        assert_eq!(ColorMode::Cyclic.toggled(), ColorMode::Linear);
        assert_eq!(ColorMode::Linear.toggled().toggled(), ColorMode::Linear);
        assert_eq!(ColorMode::default(), ColorMode::Cyclic);
    }

    #[test]
    fn default_palette_is_inferno() {
        let p = Palette::default();
        assert_eq!(p.name, "Inferno");
        assert_eq!(p.len(), DEFAULT_LUT_SIZE);
    }
}
