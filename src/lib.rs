//! briny_optim: in-place optimizer update rules for CPU and GPU.
//!
//! The crate implements the parameter-update stage of a training loop: given a
//! variable, its gradient, per-rule state buffers and scalar hyperparameters,
//! each rule mutates the buffers in place.
//!
//! # Rules
//!
//! - Gradient descent
//! - Adagrad
//! - Adadelta
//! - Momentum
//! - Adam
//! - RMSProp (with momentum)
//! - Max-weight column-norm constraint
//!
//! # Modules
//!
//! - [`device`] — elementwise execution engine (sequential and rayon-parallel).
//! - [`broadcast`] — size-1 hyperparameters viewed as full-length vectors.
//! - [`ops`] — the rules, their GPU kernels, validated entry points and a name registry.
//! - [`backend`] — global backend selection.
//! - [`config`] / [`optim`] — typed hyperparameters and stateful optimizers.
//! - [`tensors`] — shaped buffers used at the dispatch boundary.
//!
//! Every rule is generic over [`float::Float`] and instantiated for `f32` and
//! `f64`. The GPU backend (feature `wgpu`) covers `f32` only and falls back to
//! the CPU for anything else.
//!
//! # Example
//!
//! ```rust
//! use briny_optim::{apply_adagrad, tensor, tensors::Tensor};
//!
//! let mut var = tensor!([1.0f32]);
//! let mut accum = tensor!([0.0f32]);
//! apply_adagrad(&mut var, &mut accum, &Tensor::scalar(0.1), &tensor!([2.0])).unwrap();
//! assert_eq!(accum.data, vec![4.0]);
//! assert!((var.data[0] - 0.9).abs() < 1e-6);
//! ```

pub mod approx;
pub mod backend;
pub mod broadcast;
pub mod config;
pub mod device;
pub mod error;
pub mod float;
pub mod ops;
pub mod optim;
pub mod tensors;

pub use error::ApplyError;
pub use ops::dispatch::{
    apply_adadelta, apply_adagrad, apply_adam, apply_gradient_descent, apply_max_weight_col_norm,
    apply_momentum, apply_rms_prop,
};
