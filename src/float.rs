//! Numeric element types accepted by the update rules.
//!
//! Every rule is written once against [`Float`] and monomorphized for the two
//! supported precisions, `f32` and `f64`. The formulas are the same for both;
//! only the rounding differs.

use core::fmt::{self, Debug, Display};
use core::ops::{Add, Div, Mul, Sub};

/// The element type of a buffer, known at compile time for each [`Float`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// IEEE-754 single precision.
    F32,
    /// IEEE-754 double precision.
    F64,
}

impl Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => f.write_str("float32"),
            Self::F64 => f.write_str("float64"),
        }
    }
}

/// A floating point element that the update rules can be instantiated for.
///
/// Sealed to `f32` and `f64`.
pub trait Float:
    Copy
    + Send
    + Sync
    + Debug
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + sealed::Sealed
    + 'static
{
    /// The runtime tag of this element type.
    const DTYPE: DType;

    /// Additive identity.
    fn zero() -> Self;
    /// Multiplicative identity.
    fn one() -> Self;

    /// Square root.
    fn sqrt(self) -> Self;

    /// Reciprocal square root, `1 / sqrt(self)`.
    #[inline]
    fn rsqrt(self) -> Self {
        Self::one() / self.sqrt()
    }

    /// `self * self`.
    #[inline]
    fn square(self) -> Self {
        self * self
    }

    /// The larger of `self` and `other`, ignoring a single `NaN` operand.
    fn max(self, other: Self) -> Self;

    /// Convert from `f32`.
    fn from_f32(x: f32) -> Self;
    /// Convert to `f32`.
    fn into_f32(self) -> f32;

    /// Convert from `f64`.
    fn from_f64(x: f64) -> Self;
    /// Convert to `f64`.
    fn into_f64(self) -> f64;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

impl Float for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn sqrt(self) -> Self {
        Self::sqrt(self)
    }

    #[inline]
    fn max(self, other: Self) -> Self {
        Self::max(self, other)
    }

    #[inline]
    fn from_f32(x: f32) -> Self {
        x
    }

    #[inline]
    fn into_f32(self) -> f32 {
        self
    }

    #[allow(clippy::cast_possible_truncation)]
    #[inline]
    fn from_f64(x: f64) -> Self {
        x as Self
    }

    #[inline]
    fn into_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Float for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn sqrt(self) -> Self {
        Self::sqrt(self)
    }

    #[inline]
    fn max(self, other: Self) -> Self {
        Self::max(self, other)
    }

    #[inline]
    fn from_f32(x: f32) -> Self {
        Self::from(x)
    }

    #[allow(clippy::cast_possible_truncation)]
    #[inline]
    fn into_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f64(x: f64) -> Self {
        x
    }

    #[inline]
    fn into_f64(self) -> f64 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsqrt_matches_reciprocal_of_sqrt() {
        assert_eq!(Float::rsqrt(4.0f32), 0.5);
        assert_eq!(Float::rsqrt(16.0f64), 0.25);
    }

    #[test]
    fn dtype_tags() {
        assert_eq!(<f32 as Float>::DTYPE, DType::F32);
        assert_eq!(<f64 as Float>::DTYPE.to_string(), "float64");
    }

    #[test]
    fn max_ignores_nan() {
        assert_eq!(Float::max(f32::NAN, 1.0), 1.0);
        assert_eq!(Float::max(0.25f64, 1.0), 1.0);
    }
}
