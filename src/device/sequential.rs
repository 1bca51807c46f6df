use super::Device;
use crate::float::Float;

/// Single-threaded device.
///
/// Runs each pass as one forward loop over the buffer. The loop body is the
/// per-index closure only, which keeps it friendly to auto-vectorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sequential;

impl Device for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    #[inline]
    fn map<T, F>(&self, out: &mut [T], f: F)
    where
        T: Float,
        F: Fn(usize, T) -> T + Sync + Send,
    {
        for (i, x) in out.iter_mut().enumerate() {
            *x = f(i, *x);
        }
    }

    #[inline]
    fn map2<T, F>(&self, a: &mut [T], b: &mut [T], f: F)
    where
        T: Float,
        F: Fn(usize, T, T) -> (T, T) + Sync + Send,
    {
        assert_eq!(a.len(), b.len(), "map2 operands differ in length");
        for (i, (x, y)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
            (*x, *y) = f(i, *x, *y);
        }
    }
}
