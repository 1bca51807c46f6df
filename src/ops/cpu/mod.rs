//! Host update rules
//!
//! # CPU Backend
//!
//! Each rule is written once, generic over the element type ([`Float`]) and the
//! execution [`Device`], and mutates its buffers in place. The dispatcher picks
//! [`Sequential`](crate::device::Sequential) or [`Parallel`](crate::device::Parallel)
//! at runtime; the GPU kernels in `ops::wgpu` mirror these formulas operation
//! for operation.
//!
//! ## Implemented Rules
//!
//! - `apply_gradient_descent`: `var -= alpha * delta`
//! - `apply_adagrad`: accumulated squared gradients
//! - `apply_adadelta`: two accumulators, learning-rate free scaling
//! - `apply_momentum`: velocity accumulation
//! - `apply_adam`: bias-corrected first and second moments
//! - `apply_rms_prop`: mean square with momentum
//! - `apply_max_weight_col_norm`: per-column squared-norm constraint
//!
//! ## Contract
//!
//! - Every buffer paired in one call has the variable's length
//! - Every hyperparameter slice holds exactly one element
//! - No checks happen here: bad shapes or hyperparameters give wrong numbers,
//!   not errors. Validation belongs to [`crate::ops::dispatch`].
//!
//! Multi-pass rules read the *new* value of a buffer only after the pass that
//! writes it has returned; buffers read before being overwritten are borrowed
//! immutably by the pass that needs their old value.
//!
//! [`Float`]: crate::float::Float
//! [`Device`]: crate::device::Device

mod adadelta;
pub use self::adadelta::apply_adadelta;

mod adagrad;
pub use self::adagrad::apply_adagrad;

mod adam;
pub use self::adam::apply_adam;

mod gradient_descent;
pub use self::gradient_descent::apply_gradient_descent;

mod max_weight_col_norm;
pub use self::max_weight_col_norm::apply_max_weight_col_norm;

mod momentum;
pub use self::momentum::apply_momentum;

mod rms_prop;
pub use self::rms_prop::apply_rms_prop;
