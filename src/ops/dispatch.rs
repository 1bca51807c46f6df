//! Validated entry points for the update rules.
//!
//! The rules in [`crate::ops::cpu`] trust their inputs. The functions here take
//! [`Tensor`]s, check that every buffer paired with `var` has its shape and that
//! every hyperparameter holds a single element, then pick a backend and run the
//! rule.
//!
//! Each rule has two forms: `apply_*` uses the global backend from
//! [`crate::backend::get_backend`], `apply_*_on` takes it explicitly.
//!
//! # Backend selection
//!
//! - `Backend::Wgpu` runs the GPU kernel when the crate is built with the `wgpu`
//!   feature and the element type is `f32`. Any GPU error leaves the buffers
//!   untouched and the rule runs on the CPU instead.
//! - `Backend::Sequential` runs on the calling thread.
//! - `Backend::Cpu` (and every fallback) runs on the rayon pool.
//!
//! Hyperparameter values are never checked; a zero epsilon or a bias-correction
//! power of 1 produces non-finite results exactly as the rules do.

use crate::backend::{Backend, get_backend};
use crate::device::{Parallel, Sequential};
use crate::error::ApplyError;
use crate::float::Float;
use crate::ops::cpu;
use crate::tensors::Tensor;

#[cfg(feature = "wgpu")]
use crate::ops::wgpu::{self as gpu, GpuError};
#[cfg(feature = "wgpu")]
use core::any::Any;

/// Runs a rule from [`cpu`] on the host device matching `$backend`.
macro_rules! on_host {
    ($backend:expr, $op:ident($($arg:expr),* $(,)?)) => {
        match $backend {
            Backend::Sequential => cpu::$op(&Sequential, $($arg),*),
            _ => cpu::$op(&Parallel::default(), $($arg),*),
        }
    };
}

fn same_shape<T>(name: &'static str, var: &Tensor<T>, other: &Tensor<T>) -> Result<(), ApplyError> {
    if var.shape == other.shape {
        Ok(())
    } else {
        Err(ApplyError::ShapeMismatch {
            name,
            expected: var.shape.clone(),
            actual: other.shape.clone(),
        })
    }
}

fn scalar<T>(name: &'static str, t: &Tensor<T>) -> Result<(), ApplyError> {
    if t.is_scalar() {
        Ok(())
    } else {
        Err(ApplyError::NotScalar {
            name,
            len: t.len(),
        })
    }
}

/// `backend` with `Wgpu` demoted to `Cpu` when the GPU path is compiled out.
fn host_or_gpu(op: &'static str, backend: Backend) -> Backend {
    if cfg!(not(feature = "wgpu")) && backend == Backend::Wgpu {
        log::debug!("{op}: built without the `wgpu` feature, running on cpu");
        return Backend::Cpu;
    }
    backend
}

#[cfg(feature = "wgpu")]
fn f32_mut<T: Float>(t: &mut Tensor<T>) -> Option<&mut [f32]> {
    (&mut t.data as &mut dyn Any)
        .downcast_mut::<Vec<f32>>()
        .map(Vec::as_mut_slice)
}

#[cfg(feature = "wgpu")]
fn f32_ref<T: Float>(t: &Tensor<T>) -> Option<&[f32]> {
    (&t.data as &dyn Any)
        .downcast_ref::<Vec<f32>>()
        .map(Vec::as_slice)
}

/// `true` if the GPU kernel ran to completion. `None` means the element type
/// has no GPU kernel.
#[cfg(feature = "wgpu")]
fn gpu_ran<T: Float>(op: &'static str, result: Option<Result<(), GpuError>>) -> bool {
    match result {
        Some(Ok(())) => true,
        Some(Err(e)) => {
            log::warn!("{op}: GPU path failed ({e}), falling back to cpu");
            false
        }
        None => {
            log::debug!("{op}: no GPU kernel for {}, running on cpu", T::DTYPE);
            false
        }
    }
}

/// `var := var - alpha · delta`.
///
/// # Errors
///
/// [`ApplyError::ShapeMismatch`] if `delta` differs from `var` in shape,
/// [`ApplyError::NotScalar`] if `alpha` is not a single element.
pub fn apply_gradient_descent<T: Float>(
    var: &mut Tensor<T>,
    alpha: &Tensor<T>,
    delta: &Tensor<T>,
) -> Result<(), ApplyError> {
    apply_gradient_descent_on(get_backend(), var, alpha, delta)
}

/// [`apply_gradient_descent`] on an explicit backend.
pub fn apply_gradient_descent_on<T: Float>(
    backend: Backend,
    var: &mut Tensor<T>,
    alpha: &Tensor<T>,
    delta: &Tensor<T>,
) -> Result<(), ApplyError> {
    const OP: &str = "ApplyGradientDescent";
    same_shape("delta", var, delta)?;
    scalar("alpha", alpha)?;
    let backend = host_or_gpu(OP, backend);

    #[cfg(feature = "wgpu")]
    if backend == Backend::Wgpu {
        let result = match (f32_mut(var), f32_ref(alpha), f32_ref(delta)) {
            (Some(var), Some(alpha), Some(delta)) => {
                Some(gpu::wgpu_apply_gradient_descent(var, alpha, delta))
            }
            _ => None,
        };
        if gpu_ran::<T>(OP, result) {
            return Ok(());
        }
    }

    on_host!(backend, apply_gradient_descent(&mut var.data, &alpha.data, &delta.data));
    Ok(())
}

/// Adagrad: `accum += grad²`, then `var -= lr · grad / sqrt(accum)`.
///
/// # Errors
///
/// Shape and scalar checks as for [`apply_gradient_descent`].
pub fn apply_adagrad<T: Float>(
    var: &mut Tensor<T>,
    accum: &mut Tensor<T>,
    lr: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<(), ApplyError> {
    apply_adagrad_on(get_backend(), var, accum, lr, grad)
}

/// [`apply_adagrad`] on an explicit backend.
pub fn apply_adagrad_on<T: Float>(
    backend: Backend,
    var: &mut Tensor<T>,
    accum: &mut Tensor<T>,
    lr: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<(), ApplyError> {
    const OP: &str = "ApplyAdagrad";
    same_shape("accum", var, accum)?;
    same_shape("grad", var, grad)?;
    scalar("lr", lr)?;
    let backend = host_or_gpu(OP, backend);

    #[cfg(feature = "wgpu")]
    if backend == Backend::Wgpu {
        let result = match (f32_mut(var), f32_mut(accum), f32_ref(lr), f32_ref(grad)) {
            (Some(var), Some(accum), Some(lr), Some(grad)) => {
                Some(gpu::wgpu_apply_adagrad(var, accum, lr, grad))
            }
            _ => None,
        };
        if gpu_ran::<T>(OP, result) {
            return Ok(());
        }
    }

    on_host!(backend, apply_adagrad(&mut var.data, &mut accum.data, &lr.data, &grad.data));
    Ok(())
}

/// Adadelta with two accumulators per variable.
///
/// `accum_grad` is rebuilt from the pre-step `accum_update`; see
/// [`cpu::apply_adadelta`] for the full formula.
#[allow(clippy::too_many_arguments)]
pub fn apply_adadelta<T: Float>(
    var: &mut Tensor<T>,
    accum_grad: &mut Tensor<T>,
    accum_update: &mut Tensor<T>,
    lr: &Tensor<T>,
    decay_rate: &Tensor<T>,
    epsilon: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<(), ApplyError> {
    apply_adadelta_on(
        get_backend(),
        var,
        accum_grad,
        accum_update,
        lr,
        decay_rate,
        epsilon,
        grad,
    )
}

/// [`apply_adadelta`] on an explicit backend.
#[allow(clippy::too_many_arguments)]
pub fn apply_adadelta_on<T: Float>(
    backend: Backend,
    var: &mut Tensor<T>,
    accum_grad: &mut Tensor<T>,
    accum_update: &mut Tensor<T>,
    lr: &Tensor<T>,
    decay_rate: &Tensor<T>,
    epsilon: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<(), ApplyError> {
    const OP: &str = "ApplyAdadelta";
    same_shape("accum_grad", var, accum_grad)?;
    same_shape("accum_update", var, accum_update)?;
    same_shape("grad", var, grad)?;
    scalar("lr", lr)?;
    scalar("decay_rate", decay_rate)?;
    scalar("epsilon", epsilon)?;
    let backend = host_or_gpu(OP, backend);

    #[cfg(feature = "wgpu")]
    if backend == Backend::Wgpu {
        let result = match (
            f32_mut(var),
            f32_mut(accum_grad),
            f32_mut(accum_update),
            f32_ref(lr),
            f32_ref(decay_rate),
            f32_ref(epsilon),
            f32_ref(grad),
        ) {
            (Some(var), Some(ag), Some(au), Some(lr), Some(rho), Some(eps), Some(grad)) => {
                Some(gpu::wgpu_apply_adadelta(var, ag, au, lr, rho, eps, grad))
            }
            _ => None,
        };
        if gpu_ran::<T>(OP, result) {
            return Ok(());
        }
    }

    on_host!(
        backend,
        apply_adadelta(
            &mut var.data,
            &mut accum_grad.data,
            &mut accum_update.data,
            &lr.data,
            &decay_rate.data,
            &epsilon.data,
            &grad.data,
        )
    );
    Ok(())
}

/// Momentum: `accum := accum · momentum + grad`, then `var -= lr · accum`.
pub fn apply_momentum<T: Float>(
    var: &mut Tensor<T>,
    accum: &mut Tensor<T>,
    lr: &Tensor<T>,
    grad: &Tensor<T>,
    momentum: &Tensor<T>,
) -> Result<(), ApplyError> {
    apply_momentum_on(get_backend(), var, accum, lr, grad, momentum)
}

/// [`apply_momentum`] on an explicit backend.
pub fn apply_momentum_on<T: Float>(
    backend: Backend,
    var: &mut Tensor<T>,
    accum: &mut Tensor<T>,
    lr: &Tensor<T>,
    grad: &Tensor<T>,
    momentum: &Tensor<T>,
) -> Result<(), ApplyError> {
    const OP: &str = "ApplyMomentum";
    same_shape("accum", var, accum)?;
    same_shape("grad", var, grad)?;
    scalar("lr", lr)?;
    scalar("momentum", momentum)?;
    let backend = host_or_gpu(OP, backend);

    #[cfg(feature = "wgpu")]
    if backend == Backend::Wgpu {
        let result = match (
            f32_mut(var),
            f32_mut(accum),
            f32_ref(lr),
            f32_ref(grad),
            f32_ref(momentum),
        ) {
            (Some(var), Some(accum), Some(lr), Some(grad), Some(mu)) => {
                Some(gpu::wgpu_apply_momentum(var, accum, lr, grad, mu))
            }
            _ => None,
        };
        if gpu_ran::<T>(OP, result) {
            return Ok(());
        }
    }

    on_host!(
        backend,
        apply_momentum(&mut var.data, &mut accum.data, &lr.data, &grad.data, &momentum.data)
    );
    Ok(())
}

/// Adam with caller-maintained bias-correction powers `β1^t` and `β2^t`.
///
/// # Errors
///
/// [`ApplyError::ShapeMismatch`] if `m`, `v` or `grad` differ from `var` in
/// shape, [`ApplyError::NotScalar`] if any of the six scalars is not a single
/// element.
#[allow(clippy::too_many_arguments)]
pub fn apply_adam<T: Float>(
    var: &mut Tensor<T>,
    m: &mut Tensor<T>,
    v: &mut Tensor<T>,
    beta1_power: &Tensor<T>,
    beta2_power: &Tensor<T>,
    lr: &Tensor<T>,
    beta1: &Tensor<T>,
    beta2: &Tensor<T>,
    epsilon: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<(), ApplyError> {
    apply_adam_on(
        get_backend(),
        var,
        m,
        v,
        beta1_power,
        beta2_power,
        lr,
        beta1,
        beta2,
        epsilon,
        grad,
    )
}

/// [`apply_adam`] on an explicit backend.
#[allow(clippy::too_many_arguments)]
pub fn apply_adam_on<T: Float>(
    backend: Backend,
    var: &mut Tensor<T>,
    m: &mut Tensor<T>,
    v: &mut Tensor<T>,
    beta1_power: &Tensor<T>,
    beta2_power: &Tensor<T>,
    lr: &Tensor<T>,
    beta1: &Tensor<T>,
    beta2: &Tensor<T>,
    epsilon: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<(), ApplyError> {
    const OP: &str = "ApplyAdam";
    same_shape("m", var, m)?;
    same_shape("v", var, v)?;
    same_shape("grad", var, grad)?;
    scalar("beta1_power", beta1_power)?;
    scalar("beta2_power", beta2_power)?;
    scalar("lr", lr)?;
    scalar("beta1", beta1)?;
    scalar("beta2", beta2)?;
    scalar("epsilon", epsilon)?;
    let backend = host_or_gpu(OP, backend);

    #[cfg(feature = "wgpu")]
    if backend == Backend::Wgpu {
        let scalars = [beta1_power, beta2_power, lr, beta1, beta2, epsilon].map(f32_ref);
        let result = match (f32_mut(var), f32_mut(m), f32_mut(v), f32_ref(grad), scalars) {
            (
                Some(var),
                Some(m),
                Some(v),
                Some(grad),
                [Some(b1p), Some(b2p), Some(lr), Some(b1), Some(b2), Some(eps)],
            ) => Some(gpu::wgpu_apply_adam(
                var, m, v, b1p, b2p, lr, b1, b2, eps, grad,
            )),
            _ => None,
        };
        if gpu_ran::<T>(OP, result) {
            return Ok(());
        }
    }

    on_host!(
        backend,
        apply_adam(
            &mut var.data,
            &mut m.data,
            &mut v.data,
            &beta1_power.data,
            &beta2_power.data,
            &lr.data,
            &beta1.data,
            &beta2.data,
            &epsilon.data,
            &grad.data,
        )
    );
    Ok(())
}

/// RMSProp with momentum.
#[allow(clippy::too_many_arguments)]
pub fn apply_rms_prop<T: Float>(
    var: &mut Tensor<T>,
    ms: &mut Tensor<T>,
    mom: &mut Tensor<T>,
    lr: &Tensor<T>,
    rho: &Tensor<T>,
    momentum: &Tensor<T>,
    epsilon: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<(), ApplyError> {
    apply_rms_prop_on(
        get_backend(),
        var,
        ms,
        mom,
        lr,
        rho,
        momentum,
        epsilon,
        grad,
    )
}

/// [`apply_rms_prop`] on an explicit backend.
#[allow(clippy::too_many_arguments)]
pub fn apply_rms_prop_on<T: Float>(
    backend: Backend,
    var: &mut Tensor<T>,
    ms: &mut Tensor<T>,
    mom: &mut Tensor<T>,
    lr: &Tensor<T>,
    rho: &Tensor<T>,
    momentum: &Tensor<T>,
    epsilon: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<(), ApplyError> {
    const OP: &str = "ApplyRMSProp";
    same_shape("ms", var, ms)?;
    same_shape("mom", var, mom)?;
    same_shape("grad", var, grad)?;
    scalar("lr", lr)?;
    scalar("rho", rho)?;
    scalar("momentum", momentum)?;
    scalar("epsilon", epsilon)?;
    let backend = host_or_gpu(OP, backend);

    #[cfg(feature = "wgpu")]
    if backend == Backend::Wgpu {
        let scalars = [lr, rho, momentum, epsilon].map(f32_ref);
        let result = match (f32_mut(var), f32_mut(ms), f32_mut(mom), f32_ref(grad), scalars) {
            (
                Some(var),
                Some(ms),
                Some(mom),
                Some(grad),
                [Some(lr), Some(rho), Some(mu), Some(eps)],
            ) => Some(gpu::wgpu_apply_rms_prop(var, ms, mom, lr, rho, mu, eps, grad)),
            _ => None,
        };
        if gpu_ran::<T>(OP, result) {
            return Ok(());
        }
    }

    on_host!(
        backend,
        apply_rms_prop(
            &mut var.data,
            &mut ms.data,
            &mut mom.data,
            &lr.data,
            &rho.data,
            &momentum.data,
            &epsilon.data,
            &grad.data,
        )
    );
    Ok(())
}

/// Rescales the columns of the matrix `var` whose squared L2 norm exceeds
/// `threshold`, dividing them by that squared norm.
///
/// # Errors
///
/// [`ApplyError::NotMatrix`] if `var` is not rank 2.
pub fn apply_max_weight_col_norm<T: Float>(
    var: &mut Tensor<T>,
    threshold: f32,
) -> Result<(), ApplyError> {
    apply_max_weight_col_norm_on(get_backend(), var, threshold)
}

/// [`apply_max_weight_col_norm`] on an explicit backend.
pub fn apply_max_weight_col_norm_on<T: Float>(
    backend: Backend,
    var: &mut Tensor<T>,
    threshold: f32,
) -> Result<(), ApplyError> {
    const OP: &str = "ApplyMaxWeightColNorm";
    let cols = match var.shape.as_slice() {
        &[_, cols] => cols,
        _ => {
            return Err(ApplyError::NotMatrix {
                shape: var.shape.clone(),
            });
        }
    };
    let backend = host_or_gpu(OP, backend);
    let mut scale = vec![T::zero(); cols];

    #[cfg(feature = "wgpu")]
    if backend == Backend::Wgpu {
        let result = f32_mut(var).map(|var| {
            let mut scale = vec![0.0f32; cols];
            gpu::wgpu_apply_max_weight_col_norm(var, &mut scale, threshold)
        });
        if gpu_ran::<T>(OP, result) {
            return Ok(());
        }
    }

    on_host!(
        backend,
        apply_max_weight_col_norm(&mut var.data, cols, &mut scale, threshold)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::approx_eq;
    use crate::tensor;

    #[test]
    fn shape_mismatch_names_the_offending_buffer() {
        let mut var = tensor!([1.0f32, 2.0]);
        let mut accum = tensor!([0.0f32, 0.0, 0.0]);
        let err = apply_adagrad_on(
            Backend::Sequential,
            &mut var,
            &mut accum,
            &Tensor::scalar(0.1),
            &tensor!([1.0, 1.0]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ApplyError::ShapeMismatch {
                name: "accum",
                expected: vec![2],
                actual: vec![3],
            }
        );
        assert_eq!(var.data, vec![1.0, 2.0]);
    }

    #[test]
    fn hyperparameters_must_be_size_one() {
        let mut var = tensor!([1.0f64, 2.0]);
        let err = apply_gradient_descent_on(
            Backend::Cpu,
            &mut var,
            &tensor!([0.1, 0.1]),
            &tensor!([1.0, 1.0]),
        )
        .unwrap_err();
        assert_eq!(err, ApplyError::NotScalar { name: "alpha", len: 2 });
    }

    #[test]
    fn scalar_of_any_rank_is_accepted() {
        let mut var = tensor!([1.0f64, 2.0]);
        let alpha = Tensor::new(vec![1, 1], vec![0.5]);
        apply_gradient_descent_on(Backend::Sequential, &mut var, &alpha, &tensor!([2.0, 2.0]))
            .unwrap();
        assert!(approx_eq(&var.data, &vec![0.0, 1.0]));
    }

    #[test]
    fn col_norm_requires_a_matrix() {
        let mut var = tensor!([3.0f32, 4.0]);
        let err = apply_max_weight_col_norm_on(Backend::Sequential, &mut var, 1.0).unwrap_err();
        assert_eq!(err, ApplyError::NotMatrix { shape: vec![2] });
    }

    #[test]
    fn col_norm_allocates_its_own_scratch() {
        let mut var = tensor!([[3.0f64, 0.5], [4.0, 0.5]]);
        apply_max_weight_col_norm_on(Backend::Cpu, &mut var, 1.0).unwrap();
        assert!(approx_eq(&var.data, &vec![0.12, 0.5, 0.16, 0.5]));
    }

    #[test]
    fn empty_buffers_are_a_no_op() {
        let mut var: Tensor<f32> = Tensor::new(vec![0], vec![]);
        let mut accum = var.clone();
        apply_momentum_on(
            Backend::Wgpu,
            &mut var,
            &mut accum,
            &Tensor::scalar(0.1),
            &Tensor::new(vec![0], vec![]),
            &Tensor::scalar(0.9),
        )
        .unwrap();
        assert!(var.is_empty());
    }
}
