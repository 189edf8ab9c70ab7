use crate::complex::Complex;

/// Squared bailout radius: an orbit with `|z|² > 4` is guaranteed to diverge.
pub const ESCAPE_RADIUS_SQ: f64 = 4.0;

/// Iterations to run before periodicity checks begin.
///
/// Orbits near the boundary can pass close to an earlier point long before
/// they settle, so early checkpoints produce false interior hits.
pub const PERIODICITY_WARMUP: u32 = 50;

/// Iterations between periodicity checkpoints.
pub const PERIODICITY_INTERVAL: u32 = 20;

/// Relative tolerance for the periodicity test, scaled by `max(1, |z|²)`.
pub const PERIODICITY_TOLERANCE: f64 = 1e-12;

/// Outcome of a single escape-time evaluation, with loop instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeTrace {
    /// Escape iteration in `[0, max_iterations)`, or `max_iterations` when
    /// the point was classified as non-escaping.
    pub iterations: u32,
    /// Number of recurrence steps actually executed. Zero when a closed-form
    /// interior test short-circuited the loop.
    pub steps: u32,
}

impl EscapeTrace {
    #[inline]
    pub fn escaped(&self, max_iterations: u32) -> bool {
        self.iterations < max_iterations
    }
}

/// Returns `true` if `c` lies inside the main cardioid.
///
/// This is a closed-form check that avoids iterating a large share of the
/// visible points at the default zoom level.
#[inline]
pub fn in_cardioid(c: Complex) -> bool {
    let im2 = c.im * c.im;
    let x = c.re - 0.25;
    let q = x * x + im2;
    q * (q + x) <= 0.25 * im2
}

/// Returns `true` if `c` lies inside the period-2 bulb (radius ¼ around -1).
#[inline]
pub fn in_period2_bulb(c: Complex) -> bool {
    let x = c.re + 1.0;
    x * x + c.im * c.im <= 0.0625
}

/// Returns `true` if either closed-form interior test classifies `c`.
#[inline]
pub fn is_known_interior(c: Complex) -> bool {
    in_period2_bulb(c) || in_cardioid(c)
}

/// Escape-time iteration count for the seed `c`.
///
/// Returns `max_iterations` for points classified as inside the set, and the
/// 0-based step index at which `|z|²` first exceeded 4 otherwise, so the
/// result lies in `[0, max_iterations]`. The cap must be at least 1;
/// [`Viewport`](crate::Viewport) rejects a zero cap before it gets here.
#[inline]
pub fn escape_time(c: Complex, max_iterations: u32) -> u32 {
    escape_time_traced(c, max_iterations).iterations
}

/// Same as [`escape_time`], also reporting how many loop steps ran.
pub fn escape_time_traced(c: Complex, max_iterations: u32) -> EscapeTrace {
    debug_assert!(max_iterations >= 1, "iteration cap must be at least 1");
    let max_iter = max_iterations.max(1);

    if is_known_interior(c) {
        return EscapeTrace {
            iterations: max_iter,
            steps: 0,
        };
    }

    let mut z = Complex::ZERO;
    let mut checkpoint = z;

    for n in 0..max_iter {
        z = z.square_add(c);

        let norm_sq = z.norm_sq();
        if norm_sq > ESCAPE_RADIUS_SQ {
            return EscapeTrace {
                iterations: n,
                steps: n + 1,
            };
        }

        if n == PERIODICITY_WARMUP {
            checkpoint = z;
        } else if n > PERIODICITY_WARMUP && (n - PERIODICITY_WARMUP) % PERIODICITY_INTERVAL == 0 {
            if z.distance_sq(checkpoint) < PERIODICITY_TOLERANCE * norm_sq.max(1.0) {
                return EscapeTrace {
                    iterations: max_iter,
                    steps: n + 1,
                };
            }
            checkpoint = z;
        }
    }

    EscapeTrace {
        iterations: max_iter,
        steps: max_iter,
    }
}
