use super::{ADAGRAD_KERNEL, GpuError, kernel, launch};
use crate::broadcast::Broadcast;

/// Adagrad on the GPU.
///
/// Pass `accumulate` adds `grad²` into `accum`, pass `main` applies
/// `var -= lr · grad / sqrt(accum)` with the new accumulator.
pub fn wgpu_apply_adagrad(
    var: &mut [f32],
    accum: &mut [f32],
    lr: &[f32],
    grad: &[f32],
) -> Result<(), GpuError> {
    let n = var.len();
    let lr = Broadcast::new(lr, n).value();
    launch(
        kernel(&ADAGRAD_KERNEL)?,
        &mut [var, accum],
        &[grad],
        &[lr],
        &[n, n],
    )
}
