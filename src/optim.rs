//! Stateful optimizers.
//!
//! An [`Optimizer`] owns the auxiliary buffers ("slots") of one variable and the
//! running values the caller would otherwise maintain, such as Adam's
//! bias-correction powers. Each [`Optimizer::step`] validates its inputs and
//! runs the configured rule through [`crate::ops::dispatch`].
//!
//! ```
//! use briny_optim::config::AdamConfig;
//! use briny_optim::optim::Optimizer;
//! use briny_optim::tensor;
//!
//! let mut var = tensor!([1.0f32, 2.0]);
//! let mut opt = Optimizer::new(AdamConfig::default(), var.shape.clone());
//! opt.step(&mut var, &tensor!([0.5, -0.5])).unwrap();
//! assert_eq!(opt.steps(), 1);
//! assert!(var.data[0] < 1.0 && var.data[1] > 2.0);
//! ```

use crate::backend::{Backend, get_backend};
use crate::config::OptimizerConfig;
use crate::error::ApplyError;
use crate::float::Float;
use crate::ops::dispatch;
use crate::tensors::Tensor;

/// Update rule state for a single variable.
#[derive(Debug, Clone)]
pub struct Optimizer<T: Float> {
    config: OptimizerConfig,
    shape: Vec<usize>,
    slots: Vec<Tensor<T>>,
    beta1_power: T,
    beta2_power: T,
    steps: u64,
    backend: Option<Backend>,
}

impl<T: Float> Optimizer<T> {
    /// Creates the optimizer for a variable of the given shape.
    ///
    /// Adagrad's accumulator starts at `initial_accumulator_value`, every other
    /// slot at zero.
    pub fn new(config: impl Into<OptimizerConfig>, shape: impl Into<Vec<usize>>) -> Self {
        let config = config.into();
        let shape = shape.into();
        let mut opt = Self {
            config,
            slots: initial_slots(&config, &shape),
            shape,
            beta1_power: T::one(),
            beta2_power: T::one(),
            steps: 0,
            backend: None,
        };
        opt.reset_powers();
        log::debug!(
            "{} optimizer for shape {:?} with {} slot(s)",
            config.op(),
            opt.shape,
            opt.slots.len()
        );
        opt
    }

    /// Pins this optimizer to `backend` instead of the global one.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// The auxiliary buffers, in the order the registry expects them.
    pub fn slots(&self) -> &[Tensor<T>] {
        &self.slots
    }

    /// Number of successful steps since creation or the last [`Self::reset`].
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Adam's `(β1^t, β2^t)` for the next step; `(1, 1)` for other rules.
    pub fn bias_correction_powers(&self) -> (T, T) {
        (self.beta1_power, self.beta2_power)
    }

    /// Restores every slot and running value to its initial state.
    pub fn reset(&mut self) {
        self.slots = initial_slots(&self.config, &self.shape);
        self.reset_powers();
        self.steps = 0;
    }

    fn reset_powers(&mut self) {
        (self.beta1_power, self.beta2_power) = match self.config {
            OptimizerConfig::Adam(c) => (T::from_f64(c.beta1), T::from_f64(c.beta2)),
            _ => (T::one(), T::one()),
        };
    }

    /// Applies one update to `var` from `grad`.
    ///
    /// The column-norm constraint ignores `grad`.
    ///
    /// # Errors
    ///
    /// Any validation error of the underlying rule. Nothing is modified when an
    /// error is returned.
    pub fn step(&mut self, var: &mut Tensor<T>, grad: &Tensor<T>) -> Result<(), ApplyError> {
        let backend = self.backend.unwrap_or_else(get_backend);
        let s = |x: f64| Tensor::scalar(T::from_f64(x));

        match (&self.config, self.slots.as_mut_slice()) {
            (OptimizerConfig::GradientDescent(c), []) => {
                dispatch::apply_gradient_descent_on(backend, var, &s(c.learning_rate), grad)?;
            }
            (OptimizerConfig::Adagrad(c), [accum]) => {
                dispatch::apply_adagrad_on(backend, var, accum, &s(c.learning_rate), grad)?;
            }
            (OptimizerConfig::Adadelta(c), [accum_grad, accum_update]) => {
                dispatch::apply_adadelta_on(
                    backend,
                    var,
                    accum_grad,
                    accum_update,
                    &s(c.learning_rate),
                    &s(c.decay_rate),
                    &s(c.epsilon),
                    grad,
                )?;
            }
            (OptimizerConfig::Momentum(c), [accum]) => {
                dispatch::apply_momentum_on(
                    backend,
                    var,
                    accum,
                    &s(c.learning_rate),
                    grad,
                    &s(c.momentum),
                )?;
            }
            (OptimizerConfig::Adam(c), [m, v]) => {
                dispatch::apply_adam_on(
                    backend,
                    var,
                    m,
                    v,
                    &Tensor::scalar(self.beta1_power),
                    &Tensor::scalar(self.beta2_power),
                    &s(c.learning_rate),
                    &s(c.beta1),
                    &s(c.beta2),
                    &s(c.epsilon),
                    grad,
                )?;
                self.beta1_power = self.beta1_power * T::from_f64(c.beta1);
                self.beta2_power = self.beta2_power * T::from_f64(c.beta2);
            }
            (OptimizerConfig::RmsProp(c), [ms, mom]) => {
                dispatch::apply_rms_prop_on(
                    backend,
                    var,
                    ms,
                    mom,
                    &s(c.learning_rate),
                    &s(c.decay),
                    &s(c.momentum),
                    &s(c.epsilon),
                    grad,
                )?;
            }
            (OptimizerConfig::MaxWeightColNorm(c), []) => {
                dispatch::apply_max_weight_col_norm_on(backend, var, c.threshold)?;
            }
            (config, slots) => {
                let (expected_slots, expected_scalars) = config.op().arity();
                return Err(ApplyError::Arity {
                    op: config.op().name(),
                    expected_slots,
                    expected_scalars,
                    slots: slots.len(),
                    scalars: expected_scalars,
                });
            }
        }

        self.steps += 1;
        Ok(())
    }
}

fn initial_slots<T: Float>(config: &OptimizerConfig, shape: &[usize]) -> Vec<Tensor<T>> {
    let zeros = || Tensor::filled(shape, T::zero());
    match config {
        OptimizerConfig::GradientDescent(_) | OptimizerConfig::MaxWeightColNorm(_) => Vec::new(),
        OptimizerConfig::Adagrad(c) => {
            vec![Tensor::filled(shape, T::from_f64(c.initial_accumulator_value))]
        }
        OptimizerConfig::Momentum(_) => vec![zeros()],
        OptimizerConfig::Adadelta(_) | OptimizerConfig::Adam(_) | OptimizerConfig::RmsProp(_) => {
            vec![zeros(), zeros()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::approx_eq;
    use crate::config::{AdagradConfig, AdamConfig, MomentumConfig};
    use crate::tensor;

    #[test]
    fn adagrad_accumulator_starts_at_initial_value() {
        let opt = Optimizer::<f64>::new(AdagradConfig::default(), vec![3]);
        assert_eq!(opt.slots().len(), 1);
        assert_eq!(opt.slots()[0].data, vec![0.1; 3]);
    }

    #[test]
    fn adam_powers_advance_and_reset() {
        let mut var = tensor!([1.0f64, 1.0]);
        let mut opt = Optimizer::new(AdamConfig::default(), var.shape.clone())
            .with_backend(Backend::Sequential);
        assert_eq!(opt.bias_correction_powers(), (0.9, 0.999));

        opt.step(&mut var, &tensor!([0.1, 0.2])).unwrap();
        opt.step(&mut var, &tensor!([0.1, 0.2])).unwrap();
        let (b1p, b2p) = opt.bias_correction_powers();
        assert!(approx_eq(&b1p, &0.729));
        assert!(approx_eq(&b2p, &0.997_002_999));
        assert_eq!(opt.steps(), 2);

        opt.reset();
        assert_eq!(opt.bias_correction_powers(), (0.9, 0.999));
        assert_eq!(opt.steps(), 0);
        assert!(opt.slots().iter().all(|s| s.data.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn failed_step_changes_nothing() {
        let mut var = tensor!([1.0f32, 2.0]);
        let mut opt = Optimizer::new(MomentumConfig::default(), vec![2]);
        let err = opt.step(&mut var, &tensor!([1.0f32])).unwrap_err();
        assert!(matches!(err, ApplyError::ShapeMismatch { name: "grad", .. }));
        assert_eq!(var.data, vec![1.0, 2.0]);
        assert_eq!(opt.steps(), 0);
    }

    #[test]
    fn momentum_steps_compound() {
        let mut var = tensor!([0.0f64]);
        let mut opt = Optimizer::new(MomentumConfig::default(), vec![1]).with_backend(Backend::Cpu);
        opt.step(&mut var, &tensor!([1.0])).unwrap();
        opt.step(&mut var, &tensor!([1.0])).unwrap();
        // accum: 1.0 then 1.9; var: -0.1 then -0.29
        assert!(approx_eq(&var.data, &vec![-0.29]));
    }
}
