use crate::broadcast::Broadcast;
use crate::device::Device;
use crate::float::Float;

/// Performs one Adadelta step.
///
/// # Formula
///
/// ```text
/// accum_grad   := accum_update · decay + grad² · (1 - decay)
/// update       := sqrt(accum_update + ε) · rsqrt(accum_grad + ε) · grad
/// accum_update := accum_update · decay + update² · (1 - decay)
/// var          := var - update · lr
/// ```
///
/// The `accum_grad` blend starts from the previous `accum_update`, not from the
/// previous `accum_grad`. This differs from the published algorithm and is kept
/// as-is; the old contents of `accum_grad` never influence the result.
///
/// # Passes
///
/// 1. `accum_grad` is fully rewritten.
/// 2. `update` is evaluated once per element from the new `accum_grad` and the
///    *old* `accum_update`, then written into `accum_update` and `var`.
///
/// # Arguments
///
/// - `var`: Parameters, updated in place
/// - `accum_grad`, `accum_update`: Accumulators, updated in place
/// - `lr`, `decay_rate`, `epsilon`: Size-1 hyperparameters
/// - `grad`: Gradient
#[allow(clippy::too_many_arguments)]
pub fn apply_adadelta<D: Device, T: Float>(
    d: &D,
    var: &mut [T],
    accum_grad: &mut [T],
    accum_update: &mut [T],
    lr: &[T],
    decay_rate: &[T],
    epsilon: &[T],
    grad: &[T],
) {
    let n = grad.len();
    let lr = Broadcast::new(lr, n);
    let decay = Broadcast::new(decay_rate, n);
    let eps = Broadcast::new(epsilon, n);
    let one = T::one();

    {
        let prev_update = &*accum_update;
        d.map(accum_grad, |i, _| {
            prev_update[i] * decay.at(i) + grad[i].square() * (one - decay.at(i))
        });
    }

    let accum_grad = &*accum_grad;
    d.map2(accum_update, var, |i, prev_update, v| {
        let update =
            (prev_update + eps.at(i)).sqrt() * (accum_grad[i] + eps.at(i)).rsqrt() * grad[i];
        (
            prev_update * decay.at(i) + update.square() * (one - decay.at(i)),
            v - update * lr.at(i),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::approx_eq;
    use crate::device::{Parallel, Sequential};

    struct Expected {
        accum_grad: f64,
        accum_update: f64,
        var: f64,
    }

    fn reference(var: f64, accum_update: f64, lr: f64, decay: f64, eps: f64, grad: f64) -> Expected {
        let accum_grad = accum_update * decay + grad * grad * (1.0 - decay);
        let update = (accum_update + eps).sqrt() / (accum_grad + eps).sqrt() * grad;
        Expected {
            accum_grad,
            accum_update: accum_update * decay + update * update * (1.0 - decay),
            var: var - update * lr,
        }
    }

    #[test]
    fn matches_reference_formula() {
        let e = reference(1.0, 0.5, 1.0, 0.9, 1e-6, 2.0);

        let mut var = [1.0f64];
        let mut accum_grad = [0.0f64];
        let mut accum_update = [0.5f64];
        apply_adadelta(
            &Sequential,
            &mut var,
            &mut accum_grad,
            &mut accum_update,
            &[1.0],
            &[0.9],
            &[1e-6],
            &[2.0],
        );

        assert!(approx_eq(&accum_grad, &[e.accum_grad]));
        assert!(approx_eq(&accum_update, &[e.accum_update]));
        assert!(approx_eq(&var, &[e.var]));
    }

    #[test]
    fn previous_accum_grad_is_ignored() {
        let run = |initial_accum_grad: f32| {
            let mut var = vec![0.3f32, -0.7];
            let mut accum_grad = vec![initial_accum_grad; 2];
            let mut accum_update = vec![0.2f32, 0.05];
            apply_adadelta(
                &Parallel::with_grain(1),
                &mut var,
                &mut accum_grad,
                &mut accum_update,
                &[0.5],
                &[0.95],
                &[1e-8],
                &[0.4, -1.5],
            );
            (var, accum_grad, accum_update)
        };

        assert_eq!(run(0.0), run(123.0));
    }

    #[test]
    fn update_uses_pre_step_accum_update() {
        // with accum_update = 0 and eps = 1 the step is exactly 1/sqrt(accum_grad + 1) · grad
        let mut var = [0.0f64];
        let mut accum_grad = [0.0f64];
        let mut accum_update = [0.0f64];
        apply_adadelta(
            &Sequential,
            &mut var,
            &mut accum_grad,
            &mut accum_update,
            &[1.0],
            &[0.0],
            &[1.0],
            &[3.0],
        );
        // accum_grad = 9, update = 1 · (1/sqrt(10)) · 3
        let update = 3.0 / 10.0f64.sqrt();
        assert_eq!(accum_grad, [9.0]);
        assert!(approx_eq(&accum_update, &[update * update]));
        assert!(approx_eq(&var, &[-update]));
    }
}
