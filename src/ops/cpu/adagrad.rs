use crate::broadcast::Broadcast;
use crate::device::Device;
use crate::float::Float;

/// Performs one Adagrad step.
///
/// # Formula
///
/// ```text
/// accum := accum + grad²
/// var   := var - lr · grad / sqrt(accum)
/// ```
///
/// `accum` never decreases. No epsilon is added: a zero accumulator paired with
/// a zero gradient divides zero by zero, so callers seed `accum` with a small
/// positive value.
///
/// # Arguments
///
/// - `var`: Parameters, updated in place
/// - `accum`: Accumulated squared gradients, updated in place
/// - `lr`: Learning rate (size 1)
/// - `grad`: Gradient
pub fn apply_adagrad<D: Device, T: Float>(
    d: &D,
    var: &mut [T],
    accum: &mut [T],
    lr: &[T],
    grad: &[T],
) {
    let lr = Broadcast::new(lr, grad.len());

    d.map(accum, |i, a| a + grad[i].square());

    let accum = &*accum;
    d.map(var, |i, v| v - lr.at(i) * grad[i] / accum[i].sqrt());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::approx_eq;
    use crate::device::{Parallel, Sequential};

    #[test]
    fn single_step_from_zero_accumulator() {
        let mut var = [1.0f32];
        let mut accum = [0.0f32];
        apply_adagrad(&Sequential, &mut var, &mut accum, &[0.1], &[2.0]);
        assert_eq!(accum, [4.0]);
        assert!(approx_eq(&var, &[0.9]));
    }

    #[test]
    fn accumulator_is_monotonic() {
        let d = Parallel::with_grain(2);
        let mut var = vec![0.5f64; 8];
        let mut accum = vec![0.1f64; 8];
        let grads: Vec<f64> = (0..8u8).map(|i| f64::from(i) - 3.5).collect();

        let mut previous = accum.clone();
        for _ in 0..5 {
            apply_adagrad(&d, &mut var, &mut accum, &[0.01], &grads);
            assert!(accum.iter().zip(&previous).all(|(now, before)| now > before));
            previous.clone_from(&accum);
        }
    }
}
