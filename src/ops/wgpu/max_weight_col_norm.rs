use super::{GpuError, MAX_WEIGHT_COL_NORM_KERNEL, kernel, launch};

/// Column-norm clamp on the GPU.
///
/// `var` is row-major with `scale.len()` columns. One invocation per column
/// computes the squared norm and the clamp; the rescale runs one invocation
/// per element.
pub fn wgpu_apply_max_weight_col_norm(
    var: &mut [f32],
    scale: &mut [f32],
    threshold: f32,
) -> Result<(), GpuError> {
    let (n, cols) = (var.len(), scale.len());
    launch(
        kernel(&MAX_WEIGHT_COL_NORM_KERNEL)?,
        &mut [var, scale],
        &[],
        &[threshold],
        &[cols, cols, n],
    )
}
