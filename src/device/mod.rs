//! Elementwise execution engine.
//!
//! # Devices
//!
//! Every update rule is a short sequence of elementwise passes. A [`Device`]
//! runs one pass: it calls a per-index function for every element of the
//! output buffer(s) and returns only once all of them are written, so
//! consecutive calls form a full-buffer barrier.
//!
//! Within a pass there is no ordering between indices; each index may only read
//! its own position of the buffers the closure captures.
//!
//! ## Implementations
//!
//! - [`Sequential`] — one thread, a tight loop the compiler can auto-vectorize
//! - [`Parallel`] — data-parallel over disjoint chunks using [`rayon`](https://docs.rs/rayon)
//!
//! Both evaluate the same scalar expression per index in the same order, so
//! results are bit-identical.

use crate::float::Float;

mod parallel;
pub use self::parallel::Parallel;

mod sequential;
pub use self::sequential::Sequential;

/// A backend able to run one elementwise pass over a buffer.
pub trait Device: Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Sets `out[i] = f(i, out[i])` for every index.
    fn map<T, F>(&self, out: &mut [T], f: F)
    where
        T: Float,
        F: Fn(usize, T) -> T + Sync + Send;

    /// Sets `(a[i], b[i]) = f(i, a[i], b[i])` for every index.
    ///
    /// # Panics
    ///
    /// Panics if `a` and `b` differ in length.
    fn map2<T, F>(&self, a: &mut [T], b: &mut [T], f: F)
    where
        T: Float,
        F: Fn(usize, T, T) -> (T, T) + Sync + Send;
}
