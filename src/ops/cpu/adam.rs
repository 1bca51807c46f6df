use crate::broadcast::Broadcast;
use crate::device::Device;
use crate::float::Float;

/// Performs one Adam step.
///
/// # Formula
///
/// ```text
/// m   := m + (1 - β1) · (grad - m)
/// v   := v + (1 - β2) · (grad² - v)
/// var := var - (lr · sqrt(1 - β2^t) / (1 - β1^t)) · m / (ε + sqrt(v))
/// ```
///
/// Both moments are fully updated before the variable step, which reads the
/// new `m` and `v`. The bias-corrected step size is a scalar computed once.
///
/// # Arguments
///
/// - `var`: Parameters, updated in place
/// - `m`, `v`: First and second moment estimates, updated in place
/// - `beta1_power`, `beta2_power`: `β1^t` and `β2^t`, maintained by the caller;
///   both must be strictly below 1
/// - `lr`, `beta1`, `beta2`, `epsilon`: Size-1 hyperparameters
/// - `grad`: Gradient
#[allow(clippy::too_many_arguments)]
pub fn apply_adam<D: Device, T: Float>(
    d: &D,
    var: &mut [T],
    m: &mut [T],
    v: &mut [T],
    beta1_power: &[T],
    beta2_power: &[T],
    lr: &[T],
    beta1: &[T],
    beta2: &[T],
    epsilon: &[T],
    grad: &[T],
) {
    let n = grad.len();
    let one = T::one();
    let beta1 = Broadcast::new(beta1, n);
    let beta2 = Broadcast::new(beta2, n);
    let eps = Broadcast::new(epsilon, n);

    let beta1_power = Broadcast::new(beta1_power, n).value();
    let beta2_power = Broadcast::new(beta2_power, n).value();
    let step = Broadcast::splat(
        Broadcast::new(lr, n).value() * (one - beta2_power).sqrt() / (one - beta1_power),
        n,
    );

    d.map(m, |i, m| m + (one - beta1.at(i)) * (grad[i] - m));
    d.map(v, |i, v| v + (one - beta2.at(i)) * (grad[i].square() - v));

    let (m, v) = (&*m, &*v);
    d.map(var, |i, x| x - step.at(i) * m[i] / (eps.at(i) + v[i].sqrt()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::{approx_eq, approx_eq_within, ApproxEquality};
    use crate::device::{Parallel, Sequential};

    #[test]
    fn first_step_moves_by_learning_rate() {
        // t = 1: m = 0.1g, v = 0.001g², step = lr·sqrt(0.001)/0.1,
        // so var moves by lr · sign(g) up to epsilon
        let mut var = [1.0f64, 1.0];
        let mut m = [0.0f64; 2];
        let mut v = [0.0f64; 2];
        apply_adam(
            &Sequential,
            &mut var,
            &mut m,
            &mut v,
            &[0.9],
            &[0.999],
            &[0.01],
            &[0.9],
            &[0.999],
            &[1e-8],
            &[0.5, -2.0],
        );
        assert!(approx_eq(&m, &[0.05, -0.2]));
        assert!(approx_eq(&v, &[0.00025, 0.004]));
        assert!(approx_eq_within(&var, &[0.99, 1.01], ApproxEquality::Partial));
    }

    #[test]
    fn step_reads_updated_moments() {
        let mut var = [0.0f32];
        let mut m = [1.0f32];
        let mut v = [4.0f32];
        // β = 0 replaces both moments with the current gradient statistics
        apply_adam(
            &Parallel::default(),
            &mut var,
            &mut m,
            &mut v,
            &[0.0],
            &[0.0],
            &[1.0],
            &[0.0],
            &[0.0],
            &[0.0],
            &[3.0],
        );
        assert_eq!(m, [3.0]);
        assert_eq!(v, [9.0]);
        assert!(approx_eq(&var, &[-1.0]));
    }
}
