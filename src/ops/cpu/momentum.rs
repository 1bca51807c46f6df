use crate::broadcast::Broadcast;
use crate::device::Device;
use crate::float::Float;

/// Performs one momentum step.
///
/// ```text
/// accum := accum · momentum + grad
/// var   := var - lr · accum
/// ```
///
/// The variable moves by the *new* velocity, so a zero gradient still shifts
/// `var` while `accum` is non-zero.
pub fn apply_momentum<D: Device, T: Float>(
    d: &D,
    var: &mut [T],
    accum: &mut [T],
    lr: &[T],
    grad: &[T],
    momentum: &[T],
) {
    let n = grad.len();
    let lr = Broadcast::new(lr, n);
    let momentum = Broadcast::new(momentum, n);

    d.map(accum, |i, a| a * momentum.at(i) + grad[i]);

    let accum = &*accum;
    d.map(var, |i, v| v - lr.at(i) * accum[i]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::approx_eq;
    use crate::device::{Parallel, Sequential};

    #[test]
    fn first_step_uses_fresh_velocity() {
        let mut var = [2.0f32];
        let mut accum = [0.0f32];
        apply_momentum(&Sequential, &mut var, &mut accum, &[0.1], &[1.0], &[0.9]);
        assert_eq!(accum, [1.0]);
        assert!(approx_eq(&var, &[1.9]));
    }

    #[test]
    fn zero_gradient_with_zero_velocity_is_a_fixed_point() {
        let mut var = vec![1.0f64, -1.0];
        let mut accum = vec![0.0f64; 2];
        apply_momentum(&Parallel::default(), &mut var, &mut accum, &[0.5], &[0.0, 0.0], &[0.9]);
        assert_eq!(var, vec![1.0, -1.0]);
        assert_eq!(accum, vec![0.0, 0.0]);
    }

    #[test]
    fn zero_gradient_with_velocity_still_moves() {
        let mut var = vec![1.0f64, -1.0];
        let mut accum = vec![1.0f64, 2.0];
        apply_momentum(&Sequential, &mut var, &mut accum, &[0.5], &[0.0, 0.0], &[0.9]);
        assert!(approx_eq(&accum, &vec![0.9, 1.8]));
        assert!(approx_eq(&var, &vec![0.55, -1.9]));
    }
}
