use super::{ADADELTA_KERNEL, GpuError, kernel, launch};
use crate::broadcast::Broadcast;

/// Adadelta on the GPU.
///
/// `blend` rebuilds `accum_grad` from the pre-step `accum_update`; `main`
/// computes the update once per element and writes both `accum_update` and
/// `var` from it.
pub fn wgpu_apply_adadelta(
    var: &mut [f32],
    accum_grad: &mut [f32],
    accum_update: &mut [f32],
    lr: &[f32],
    decay_rate: &[f32],
    epsilon: &[f32],
    grad: &[f32],
) -> Result<(), GpuError> {
    let n = var.len();
    let params = [
        Broadcast::new(lr, n).value(),
        Broadcast::new(decay_rate, n).value(),
        Broadcast::new(epsilon, n).value(),
    ];
    launch(
        kernel(&ADADELTA_KERNEL)?,
        &mut [var, accum_grad, accum_update],
        &[grad],
        &params,
        &[n, n],
    )
}
