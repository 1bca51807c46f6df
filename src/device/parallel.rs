use super::Device;
use crate::float::Float;
use rayon::prelude::*;

/// Smallest number of elements handed to one rayon task by default.
///
/// Below this, splitting costs more than the arithmetic of any update rule.
pub const DEFAULT_GRAIN: usize = 4096;

/// Multi-threaded device backed by the global rayon pool.
///
/// Indices are split into disjoint contiguous ranges of at least `grain`
/// elements; every task writes only its own range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parallel {
    grain: usize,
}

impl Parallel {
    /// A parallel device with a custom task granularity (clamped to at least 1).
    pub const fn with_grain(grain: usize) -> Self {
        Self {
            grain: if grain == 0 { 1 } else { grain },
        }
    }
}

impl Default for Parallel {
    fn default() -> Self {
        Self::with_grain(DEFAULT_GRAIN)
    }
}

impl Device for Parallel {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn map<T, F>(&self, out: &mut [T], f: F)
    where
        T: Float,
        F: Fn(usize, T) -> T + Sync + Send,
    {
        out.par_iter_mut()
            .with_min_len(self.grain)
            .enumerate()
            .for_each(|(i, x)| *x = f(i, *x));
    }

    fn map2<T, F>(&self, a: &mut [T], b: &mut [T], f: F)
    where
        T: Float,
        F: Fn(usize, T, T) -> (T, T) + Sync + Send,
    {
        assert_eq!(a.len(), b.len(), "map2 operands differ in length");
        a.par_iter_mut()
            .zip(b.par_iter_mut())
            .with_min_len(self.grain)
            .enumerate()
            .for_each(|(i, (x, y))| (*x, *y) = f(i, *x, *y));
    }
}
