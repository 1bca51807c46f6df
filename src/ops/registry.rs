//! Name-based lookup of the update rules.
//!
//! Graph runtimes refer to the rules by operation name (`"ApplyAdam"`, ...) and
//! hand over their buffers positionally. [`Registry`] is the explicit table from
//! [`OpKind`] to the typed entry points in [`crate::ops::dispatch`]; it checks
//! how many state buffers and scalars were supplied before calling the rule.
//!
//! # Argument layout
//!
//! | Operation               | `slots`                        | `scalars`                                       |
//! |-------------------------|--------------------------------|-------------------------------------------------|
//! | `ApplyGradientDescent`  |                                | `alpha`                                         |
//! | `ApplyAdagrad`          | `accum`                        | `lr`                                            |
//! | `ApplyAdadelta`         | `accum_grad`, `accum_update`   | `lr`, `decay_rate`, `epsilon`                   |
//! | `ApplyMomentum`         | `accum`                        | `lr`, `momentum`                                |
//! | `ApplyAdam`             | `m`, `v`                       | `beta1_power`, `beta2_power`, `lr`, `beta1`, `beta2`, `epsilon` |
//! | `ApplyRMSProp`          | `ms`, `mom`                    | `lr`, `rho`, `momentum`, `epsilon`              |
//! | `ApplyMaxWeightColNorm` |                                |                                                 |
//!
//! `grad` is required by every operation except `ApplyMaxWeightColNorm`, which
//! ignores it and reads `threshold` instead.

use crate::backend::{Backend, get_backend};
use crate::error::ApplyError;
use crate::float::Float;
use crate::ops::dispatch;
use crate::tensors::Tensor;
use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;

/// The registered update operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    ApplyGradientDescent,
    ApplyAdagrad,
    ApplyAdadelta,
    ApplyMomentum,
    ApplyAdam,
    ApplyRMSProp,
    ApplyMaxWeightColNorm,
}

impl OpKind {
    /// Every operation, in registration order.
    pub const ALL: [Self; 7] = [
        Self::ApplyGradientDescent,
        Self::ApplyAdagrad,
        Self::ApplyAdadelta,
        Self::ApplyMomentum,
        Self::ApplyAdam,
        Self::ApplyRMSProp,
        Self::ApplyMaxWeightColNorm,
    ];

    /// The operation name used by graph runtimes.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ApplyGradientDescent => "ApplyGradientDescent",
            Self::ApplyAdagrad => "ApplyAdagrad",
            Self::ApplyAdadelta => "ApplyAdadelta",
            Self::ApplyMomentum => "ApplyMomentum",
            Self::ApplyAdam => "ApplyAdam",
            Self::ApplyRMSProp => "ApplyRMSProp",
            Self::ApplyMaxWeightColNorm => "ApplyMaxWeightColNorm",
        }
    }

    /// Number of state buffers and scalar hyperparameters the operation takes.
    pub const fn arity(self) -> (usize, usize) {
        match self {
            Self::ApplyGradientDescent => (0, 1),
            Self::ApplyAdagrad => (1, 1),
            Self::ApplyAdadelta => (2, 3),
            Self::ApplyMomentum => (1, 2),
            Self::ApplyAdam => (2, 6),
            Self::ApplyRMSProp => (2, 4),
            Self::ApplyMaxWeightColNorm => (0, 0),
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OpKind {
    type Err = ApplyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| ApplyError::UnknownOp(s.to_owned()))
    }
}

/// Positional arguments for one registry call.
pub struct UpdateArgs<'a, T> {
    pub var: &'a mut Tensor<T>,
    pub slots: &'a mut [Tensor<T>],
    pub grad: Option<&'a Tensor<T>>,
    pub scalars: &'a [Tensor<T>],
    /// Only read by `ApplyMaxWeightColNorm`.
    pub threshold: f32,
}

impl<'a, T> UpdateArgs<'a, T> {
    /// Arguments for a rule that takes a gradient.
    pub fn new(
        var: &'a mut Tensor<T>,
        slots: &'a mut [Tensor<T>],
        grad: &'a Tensor<T>,
        scalars: &'a [Tensor<T>],
    ) -> Self {
        Self {
            var,
            slots,
            grad: Some(grad),
            scalars,
            threshold: 0.0,
        }
    }

    /// Arguments for the column-norm constraint.
    pub fn constraint(var: &'a mut Tensor<T>, threshold: f32) -> Self {
        Self {
            var,
            slots: &mut [],
            grad: None,
            scalars: &[],
            threshold,
        }
    }
}

/// A typed entry point, called after the arity check.
pub type KernelFn<T> = fn(Backend, UpdateArgs<'_, T>) -> Result<(), ApplyError>;

/// Table of update operations for element type `T`.
pub struct Registry<T: Float> {
    kernels: HashMap<OpKind, KernelFn<T>>,
}

impl<T: Float> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Registry<T> {
    /// Builds the table with all seven operations.
    pub fn new() -> Self {
        let entries: [(OpKind, KernelFn<T>); 7] = [
            (OpKind::ApplyGradientDescent, gradient_descent::<T>),
            (OpKind::ApplyAdagrad, adagrad::<T>),
            (OpKind::ApplyAdadelta, adadelta::<T>),
            (OpKind::ApplyMomentum, momentum::<T>),
            (OpKind::ApplyAdam, adam::<T>),
            (OpKind::ApplyRMSProp, rms_prop::<T>),
            (OpKind::ApplyMaxWeightColNorm, max_weight_col_norm::<T>),
        ];
        log::debug!("registered {} update ops for {}", entries.len(), T::DTYPE);
        Self {
            kernels: entries.into_iter().collect(),
        }
    }

    /// The entry point registered for `op`.
    pub fn get(&self, op: OpKind) -> Option<KernelFn<T>> {
        self.kernels.get(&op).copied()
    }

    /// Registered operations, in no particular order.
    pub fn ops(&self) -> impl Iterator<Item = OpKind> + '_ {
        self.kernels.keys().copied()
    }

    /// Runs the operation called `name` on the global backend.
    ///
    /// # Errors
    ///
    /// [`ApplyError::UnknownOp`] for an unregistered name, [`ApplyError::Arity`]
    /// when the slot or scalar count is wrong, and any validation error of the
    /// operation itself.
    pub fn run(&self, name: &str, args: UpdateArgs<'_, T>) -> Result<(), ApplyError> {
        self.run_on(get_backend(), name.parse()?, args)
    }

    /// Runs `op` on an explicit backend.
    pub fn run_on(
        &self,
        backend: Backend,
        op: OpKind,
        args: UpdateArgs<'_, T>,
    ) -> Result<(), ApplyError> {
        let kernel = self
            .get(op)
            .ok_or_else(|| ApplyError::UnknownOp(op.name().to_owned()))?;

        if (args.slots.len(), args.scalars.len()) != op.arity() {
            return Err(arity_error(op, &args));
        }

        log::trace!("{op} on {backend}");
        kernel(backend, args)
    }
}

fn arity_error<T>(op: OpKind, args: &UpdateArgs<'_, T>) -> ApplyError {
    let (expected_slots, expected_scalars) = op.arity();
    ApplyError::Arity {
        op: op.name(),
        expected_slots,
        expected_scalars,
        slots: args.slots.len(),
        scalars: args.scalars.len(),
    }
}

fn grad<'a, T>(op: OpKind, grad: Option<&'a Tensor<T>>) -> Result<&'a Tensor<T>, ApplyError> {
    grad.ok_or(ApplyError::MissingGradient(op.name()))
}

fn gradient_descent<T: Float>(b: Backend, a: UpdateArgs<'_, T>) -> Result<(), ApplyError> {
    const OP: OpKind = OpKind::ApplyGradientDescent;
    let delta = grad(OP, a.grad)?;
    let [alpha] = a.scalars else {
        return Err(arity_error(OP, &a));
    };
    dispatch::apply_gradient_descent_on(b, a.var, alpha, delta)
}

fn adagrad<T: Float>(b: Backend, a: UpdateArgs<'_, T>) -> Result<(), ApplyError> {
    const OP: OpKind = OpKind::ApplyAdagrad;
    let g = grad(OP, a.grad)?;
    let err = arity_error(OP, &a);
    let ([accum], [lr]) = (a.slots, a.scalars) else {
        return Err(err);
    };
    dispatch::apply_adagrad_on(b, a.var, accum, lr, g)
}

fn adadelta<T: Float>(b: Backend, a: UpdateArgs<'_, T>) -> Result<(), ApplyError> {
    const OP: OpKind = OpKind::ApplyAdadelta;
    let g = grad(OP, a.grad)?;
    let err = arity_error(OP, &a);
    let ([accum_grad, accum_update], [lr, rho, eps]) = (a.slots, a.scalars) else {
        return Err(err);
    };
    dispatch::apply_adadelta_on(b, a.var, accum_grad, accum_update, lr, rho, eps, g)
}

fn momentum<T: Float>(b: Backend, a: UpdateArgs<'_, T>) -> Result<(), ApplyError> {
    const OP: OpKind = OpKind::ApplyMomentum;
    let g = grad(OP, a.grad)?;
    let err = arity_error(OP, &a);
    let ([accum], [lr, mu]) = (a.slots, a.scalars) else {
        return Err(err);
    };
    dispatch::apply_momentum_on(b, a.var, accum, lr, g, mu)
}

fn adam<T: Float>(b: Backend, a: UpdateArgs<'_, T>) -> Result<(), ApplyError> {
    const OP: OpKind = OpKind::ApplyAdam;
    let g = grad(OP, a.grad)?;
    let err = arity_error(OP, &a);
    let ([m, v], [b1p, b2p, lr, b1, b2, eps]) = (a.slots, a.scalars) else {
        return Err(err);
    };
    dispatch::apply_adam_on(b, a.var, m, v, b1p, b2p, lr, b1, b2, eps, g)
}

fn rms_prop<T: Float>(b: Backend, a: UpdateArgs<'_, T>) -> Result<(), ApplyError> {
    const OP: OpKind = OpKind::ApplyRMSProp;
    let g = grad(OP, a.grad)?;
    let err = arity_error(OP, &a);
    let ([ms, mom], [lr, rho, mu, eps]) = (a.slots, a.scalars) else {
        return Err(err);
    };
    dispatch::apply_rms_prop_on(b, a.var, ms, mom, lr, rho, mu, eps, g)
}

fn max_weight_col_norm<T: Float>(b: Backend, a: UpdateArgs<'_, T>) -> Result<(), ApplyError> {
    dispatch::apply_max_weight_col_norm_on(b, a.var, a.threshold)
}
