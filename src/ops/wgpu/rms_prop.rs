use super::{GpuError, RMS_PROP_KERNEL, kernel, launch};
use crate::broadcast::Broadcast;

/// RMSProp on the GPU, as three passes: mean square, velocity, apply.
#[allow(clippy::too_many_arguments)]
pub fn wgpu_apply_rms_prop(
    var: &mut [f32],
    ms: &mut [f32],
    mom: &mut [f32],
    lr: &[f32],
    rho: &[f32],
    momentum: &[f32],
    epsilon: &[f32],
    grad: &[f32],
) -> Result<(), GpuError> {
    let n = var.len();
    let params = [
        Broadcast::new(lr, n).value(),
        Broadcast::new(rho, n).value(),
        Broadcast::new(momentum, n).value(),
        Broadcast::new(epsilon, n).value(),
    ];
    launch(
        kernel(&RMS_PROP_KERNEL)?,
        &mut [var, ms, mom],
        &[grad],
        &params,
        &[n, n, n],
    )
}
