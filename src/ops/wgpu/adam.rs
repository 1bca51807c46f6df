use super::{ADAM_KERNEL, GpuError, kernel, launch};
use crate::broadcast::Broadcast;

/// Adam on the GPU.
///
/// The bias-corrected step size is computed here on the host, so the kernel
/// only sees `[step, beta1, beta2, epsilon]`.
#[allow(clippy::too_many_arguments)]
pub fn wgpu_apply_adam(
    var: &mut [f32],
    m: &mut [f32],
    v: &mut [f32],
    beta1_power: &[f32],
    beta2_power: &[f32],
    lr: &[f32],
    beta1: &[f32],
    beta2: &[f32],
    epsilon: &[f32],
    grad: &[f32],
) -> Result<(), GpuError> {
    let n = var.len();
    let b1p = Broadcast::new(beta1_power, n).value();
    let b2p = Broadcast::new(beta2_power, n).value();
    let step = Broadcast::new(lr, n).value() * (1.0 - b2p).sqrt() / (1.0 - b1p);
    let params = [
        step,
        Broadcast::new(beta1, n).value(),
        Broadcast::new(beta2, n).value(),
        Broadcast::new(epsilon, n).value(),
    ];
    launch(
        kernel(&ADAM_KERNEL)?,
        &mut [var, m, v],
        &[grad],
        &params,
        &[n, n],
    )
}
