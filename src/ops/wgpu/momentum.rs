use super::{GpuError, MOMENTUM_KERNEL, kernel, launch};
use crate::broadcast::Broadcast;

/// Momentum on the GPU: `accum := accum · momentum + grad`, then
/// `var -= accum · lr`.
pub fn wgpu_apply_momentum(
    var: &mut [f32],
    accum: &mut [f32],
    lr: &[f32],
    grad: &[f32],
    momentum: &[f32],
) -> Result<(), GpuError> {
    let n = var.len();
    let params = [
        Broadcast::new(lr, n).value(),
        Broadcast::new(momentum, n).value(),
    ];
    launch(
        kernel(&MOMENTUM_KERNEL)?,
        &mut [var, accum],
        &[grad],
        &params,
        &[n, n],
    )
}
