//! Shaped numeric buffers handed to the dispatcher.
//!
//! # Tensor Containers
//!
//! A [`Tensor`] pairs a row-major flat buffer with its shape. The update rules
//! themselves only see flat slices; the shape is what the dispatcher checks
//! before a rule runs (same element count, size-1 hyperparameters, rank-2
//! variables for the column-norm constraint).
//!
//! ## Design Highlights
//! - Shape is a `Vec<usize>` enforced at construction
//! - Hyperparameters are size-1 tensors so they can be broadcast
//! - No broadcasting or slicing logic lives here; see [`crate::broadcast`]
//!
//! ## Example
//!
//! ```rust
//! use briny_optim::tensors::Tensor;
//! let t = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape, vec![2, 3]);
//! assert!(Tensor::scalar(0.1).is_scalar());
//! ```

use crate::float::Float;

/// Represents an N-dimensional tensor with a shape and flat row-major data.
///
/// - `shape` defines the structure, e.g., `[2, 3]` for a 2×3 matrix.
/// - `data` holds the flattened content in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self { shape, data }
    }

    /// Creates a size-1 tensor of shape `[1]`, the container used for hyperparameters.
    pub fn scalar(value: T) -> Self {
        Self {
            shape: vec![1],
            data: vec![value],
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `true` if the tensor holds exactly one element, whatever its rank.
    pub fn is_scalar(&self) -> bool {
        self.data.len() == 1
    }

    /// `true` for rank-2 tensors.
    pub fn is_matrix(&self) -> bool {
        self.shape.len() == 2
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Copy> Tensor<T> {
    /// Creates a tensor of the given shape with every element set to `value`.
    pub fn filled(shape: impl Into<Vec<usize>>, value: T) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![value; len],
        }
    }
}

impl<T: Float> Tensor<T> {
    /// A zero tensor with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::filled(self.shape.clone(), T::zero())
    }
}

/// Defines a tensor from nested literal arrays.
///
/// # Example
/// ```
/// use briny_optim::tensor;
/// let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(t.shape, vec![2, 2]);
/// let v = tensor!([1.0, 2.0, 3.0]);
/// assert_eq!(v.shape, vec![3]);
/// ```
#[macro_export]
macro_rules! tensor {
    ([$([$($x:expr),* $(,)?]),+ $(,)?]) => {{
        let rows: Vec<Vec<_>> = vec![$(vec![$($x),*]),+];
        let cols = rows[0].len();
        assert!(rows.iter().all(|r| r.len() == cols), "ragged tensor literal");
        let n_rows = rows.len();
        $crate::tensors::Tensor::new(vec![n_rows, cols], rows.into_iter().flatten().collect())
    }};
    ([$($x:expr),* $(,)?]) => {{
        let data = vec![$($x),*];
        $crate::tensors::Tensor::new(vec![data.len()], data)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "incompatible")]
    fn new_panics_on_shape_mismatch() {
        let _ = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn scalar_is_size_one() {
        let s = Tensor::scalar(0.5f32);
        assert_eq!(s.shape, vec![1]);
        assert!(s.is_scalar());
        assert!(!s.is_matrix());
    }

    #[test]
    fn filled_and_zeros_like() {
        let t = Tensor::filled(vec![2, 3], 0.1f64);
        assert_eq!(t.len(), 6);
        assert!(t.is_matrix());
        assert!(t.zeros_like().data.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn tensor_macro_builds_row_major_matrix() {
        let t = crate::tensor!([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(t.shape, vec![3, 2]);
        assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
