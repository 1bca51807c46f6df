//! Utilities to approximate equality of floating point values.
//!
//! Update rules are compared across devices and precisions, so tests need a
//! notion of "equal up to rounding" that scales with the element type.

/// The max epsilon accepted on `f32`s.
pub const F32_MAX_ERROR: f32 = 1e-3;

/// The expected minimum epsilon accepted on `f32`s.
pub const F32_AVG_ERROR: f32 = 1e-5;

/// The best expected epsilon accepted on `f32`s.
pub const F32_MIN_ERROR: f32 = 1e-6;

/// The max epsilon accepted on `f64`s.
pub const F64_MAX_ERROR: f64 = 1e-3;

/// The expected minimum epsilon accepted on `f64`s.
pub const F64_AVG_ERROR: f64 = 1e-6;

/// The best expected epsilon accepted on `f64`s.
pub const F64_MIN_ERROR: f64 = 1e-13;

/// The approximated equality enumerated, best first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApproxEquality {
    /// Very strong epsilon.
    Precise = 0,

    /// Good epsilon.
    Partial = 1,

    /// Acceptable epsilon
    Relative = 2,

    /// No relative equality.
    Scarce = 3,
}

/// Checks the distance between two values against the precision ladder.
pub trait RelativeEq<Rhs: ?Sized> {
    /// Enumerates the equality of `self`
    fn approx_eq(&self, rhs: &Rhs) -> ApproxEquality;
}

macro_rules! impl_relative_eq {
    ($ty:ty, $min:expr, $avg:expr, $max:expr) => {
        impl RelativeEq<Self> for $ty {
            fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
                let dif = (self - rhs).abs();

                if dif < $min {
                    ApproxEquality::Precise
                } else if dif < $avg {
                    ApproxEquality::Partial
                } else if dif < $max {
                    ApproxEquality::Relative
                } else {
                    ApproxEquality::Scarce
                }
            }
        }
    };
}

impl_relative_eq!(f32, F32_MIN_ERROR, F32_AVG_ERROR, F32_MAX_ERROR);
impl_relative_eq!(f64, F64_MIN_ERROR, F64_AVG_ERROR, F64_MAX_ERROR);

impl<T: RelativeEq<U>, U> RelativeEq<[U]> for [T] {
    fn approx_eq(&self, rhs: &[U]) -> ApproxEquality {
        if self.len() != rhs.len() {
            return ApproxEquality::Scarce;
        }
        // the slice is only as good as its worst element
        self.iter()
            .zip(rhs.iter())
            .map(|(a, b)| a.approx_eq(b))
            .max()
            .unwrap_or(ApproxEquality::Precise)
    }
}

impl<const N: usize, T: RelativeEq<U>, U> RelativeEq<[U; N]> for [T; N] {
    fn approx_eq(&self, rhs: &[U; N]) -> ApproxEquality {
        self.as_slice().approx_eq(rhs.as_slice())
    }
}

impl<T: RelativeEq<U>, U> RelativeEq<Vec<U>> for Vec<T> {
    fn approx_eq(&self, rhs: &Vec<U>) -> ApproxEquality {
        self.as_slice().approx_eq(rhs.as_slice())
    }
}

/// Approximates equality at the [`ApproxEquality::Precise`] level.
pub fn approx_eq<A: RelativeEq<B> + ?Sized, B: ?Sized>(a: &A, b: &B) -> bool {
    approx_eq_within(a, b, ApproxEquality::Precise)
}

/// `true` if `a` and `b` are equal at `level` or better.
pub fn approx_eq_within<A: RelativeEq<B> + ?Sized, B: ?Sized>(
    a: &A,
    b: &B,
    level: ApproxEquality,
) -> bool {
    a.approx_eq(b) <= level
}
