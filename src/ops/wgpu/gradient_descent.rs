use super::{GRADIENT_DESCENT_KERNEL, GpuError, kernel, launch};
use crate::broadcast::Broadcast;

/// Gradient descent on the GPU: `var := var - alpha · delta`.
///
/// # Errors
///
/// Returns a [`GpuError`] if the context or kernel is unavailable or the
/// results could not be read back. `var` is untouched in that case.
pub fn wgpu_apply_gradient_descent(
    var: &mut [f32],
    alpha: &[f32],
    delta: &[f32],
) -> Result<(), GpuError> {
    let n = var.len();
    let alpha = Broadcast::new(alpha, n).value();
    launch(
        kernel(&GRADIENT_DESCENT_KERNEL)?,
        &mut [var],
        &[delta],
        &[alpha],
        &[n],
    )
}
