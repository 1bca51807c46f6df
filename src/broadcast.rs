//! Scalar-to-vector broadcast.
//!
//! Hyperparameters arrive as size-1 containers. [`Broadcast`] lets such a
//! scalar stand in for a length-`N` operand without materializing `N` copies:
//! it answers "value at index `i`" with the same scalar for every in-range `i`.

use core::fmt::Debug;

/// A size-1 value viewed as a vector of length `len`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Broadcast<T> {
    value: T,
    len: usize,
}

impl<T: Copy + Debug> Broadcast<T> {
    /// Wraps the single element of `scalar` as a length-`len` view.
    ///
    /// # Panics
    ///
    /// Panics if `scalar` is empty. A container with more than one element is a
    /// caller error caught by a debug assertion only; the first element is used.
    #[inline]
    pub fn new(scalar: &[T], len: usize) -> Self {
        debug_assert_eq!(
            scalar.len(),
            1,
            "broadcast operand must hold exactly one element, got {scalar:?}"
        );
        Self {
            value: scalar[0],
            len,
        }
    }

    /// Broadcasts an already-extracted scalar value.
    #[inline]
    pub const fn splat(value: T, len: usize) -> Self {
        Self { value, len }
    }

    /// The element at `i`, which is the broadcast scalar for every `i < len`.
    #[inline]
    pub fn at(&self, i: usize) -> T {
        debug_assert!(i < self.len, "index {i} out of range for broadcast of length {}", self.len);
        self.value
    }

    /// The underlying scalar.
    #[inline]
    pub const fn value(&self) -> T {
        self.value
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_index_sees_the_scalar() {
        let b = Broadcast::new(&[0.25f32], 5);
        assert_eq!(b.len(), 5);
        assert!((0..5).all(|i| b.at(i) == 0.25));
    }

    #[test]
    fn zero_length_view_is_empty() {
        let b = Broadcast::new(&[1.0f64], 0);
        assert!(b.is_empty());
        assert_eq!(b.value(), 1.0);
    }

    #[test]
    #[should_panic]
    fn empty_container_panics() {
        let _ = Broadcast::<f32>::new(&[], 3);
    }
}
