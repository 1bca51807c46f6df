use crate::device::Device;
use crate::float::Float;

/// Constrains the columns of a weight matrix by their squared L2 norm.
///
/// `var` is a row-major `rows × cols` matrix (rows are the feature dimension,
/// columns the units) and `scale` a scratch vector of length `cols`.
///
/// # Formula
///
/// ```text
/// scale[j] := Σ_i var[i, j]²
/// scale[j] := max(scale[j] · (scale[j] > threshold), 1)
/// var[:, j] := var[:, j] / scale[j]
/// ```
///
/// Columns whose squared norm is at or below `threshold` are left alone.
/// Columns above it are divided by the squared norm itself, not the norm, so
/// large columns shrink well below the threshold. That is the intended
/// behavior of this rule as used in training and is kept literally.
pub fn apply_max_weight_col_norm<D: Device, T: Float>(
    d: &D,
    var: &mut [T],
    cols: usize,
    scale: &mut [T],
    threshold: f32,
) {
    debug_assert_eq!(scale.len(), cols, "scale must hold one entry per column");
    let rows = var.len().checked_div(cols).unwrap_or(0);

    {
        let w = &*var;
        d.map(scale, |j, _| {
            (0..rows).fold(T::zero(), |acc, r| acc + w[r * cols + j].square())
        });
    }

    let threshold = T::from_f32(threshold);
    let (zero, one) = (T::zero(), T::one());
    d.map(scale, |_, s| {
        let exceeds = if s > threshold { one } else { zero };
        (s * exceeds).max(one)
    });

    let scale = &*scale;
    d.map(var, |k, x| x / scale[k % cols]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::approx_eq;
    use crate::device::{Parallel, Sequential};

    #[test]
    fn large_column_is_divided_by_its_squared_norm() {
        // 2×2 matrix, column 0 = [3, 4] (norm² 25), column 1 = [1, 1] (norm² 2)
        let mut var = [3.0f32, 1.0, 4.0, 1.0];
        let mut scale = [0.0f32; 2];
        apply_max_weight_col_norm(&Sequential, &mut var, 2, &mut scale, 9.0);
        assert_eq!(scale, [25.0, 1.0]);
        assert!(approx_eq(&var, &[0.12, 1.0, 0.16, 1.0]));
    }

    #[test]
    fn column_at_threshold_is_unchanged() {
        let mut var = vec![3.0f64, 0.0];
        let mut scale = vec![0.0f64];
        apply_max_weight_col_norm(&Parallel::with_grain(1), &mut var, 1, &mut scale, 9.0);
        assert_eq!(scale, vec![1.0]);
        assert_eq!(var, vec![3.0, 0.0]);
    }

    #[test]
    fn small_norm_above_threshold_clamps_to_one() {
        // norm² 0.25 exceeds 0.1 but max(0.25, 1) keeps the column as-is
        let mut var = [0.3f64, 0.4];
        let mut scale = [0.0f64];
        apply_max_weight_col_norm(&Sequential, &mut var, 1, &mut scale, 0.1);
        assert_eq!(scale, [1.0]);
        assert_eq!(var, [0.3, 0.4]);
    }

    #[test]
    fn empty_matrix_is_a_no_op() {
        let mut var: [f32; 0] = [];
        let mut scale: [f32; 0] = [];
        apply_max_weight_col_norm(&Sequential, &mut var, 0, &mut scale, 1.0);
    }
}
