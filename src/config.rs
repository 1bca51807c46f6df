//! Hyperparameter configurations.
//!
//! Each rule has a plain config struct whose `Default` carries the values used
//! by the speech training recipes these rules were tuned for. Values are stored
//! as `f64` and converted to the element type when a step runs.
//!
//! ```
//! use briny_optim::config::{AdamConfig, OptimizerConfig};
//!
//! let adam = AdamConfig::default().with_learning_rate(3e-4);
//! assert_eq!(adam.beta1, 0.9);
//!
//! let by_name = OptimizerConfig::from_name("adadelta").unwrap();
//! assert_eq!(by_name.learning_rate(), Some(1.0));
//! ```

use crate::error::ApplyError;
use crate::ops::registry::OpKind;

/// Generates consuming `with_*` setters for `f64` fields.
macro_rules! setters {
    ($ty:ident { $($field:ident => $setter:ident),* $(,)? }) => {
        impl $ty {
            $(
                #[must_use]
                pub const fn $setter(mut self, $field: f64) -> Self {
                    self.$field = $field;
                    self
                }
            )*
        }
    };
}

/// Plain gradient descent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientDescentConfig {
    pub learning_rate: f64,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self { learning_rate: 0.1 }
    }
}

setters!(GradientDescentConfig { learning_rate => with_learning_rate });

/// Adagrad. The accumulator starts at `initial_accumulator_value`, which must
/// be positive for the first step to be finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdagradConfig {
    pub learning_rate: f64,
    pub initial_accumulator_value: f64,
}

impl Default for AdagradConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            initial_accumulator_value: 0.1,
        }
    }
}

setters!(AdagradConfig {
    learning_rate => with_learning_rate,
    initial_accumulator_value => with_initial_accumulator_value,
});

/// Adadelta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdadeltaConfig {
    pub learning_rate: f64,
    pub decay_rate: f64,
    pub epsilon: f64,
}

impl Default for AdadeltaConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1.0,
            decay_rate: 0.95,
            epsilon: 1e-8,
        }
    }
}

setters!(AdadeltaConfig {
    learning_rate => with_learning_rate,
    decay_rate => with_decay_rate,
    epsilon => with_epsilon,
});

/// Adam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig {
    pub learning_rate: f64,
    /// First moment decay.
    pub beta1: f64,
    /// Second moment decay.
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

setters!(AdamConfig {
    learning_rate => with_learning_rate,
    beta1 => with_beta1,
    beta2 => with_beta2,
    epsilon => with_epsilon,
});

/// Momentum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumConfig {
    pub learning_rate: f64,
    pub momentum: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            momentum: 0.9,
        }
    }
}

setters!(MomentumConfig {
    learning_rate => with_learning_rate,
    momentum => with_momentum,
});

/// RMSProp with optional momentum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmsPropConfig {
    pub learning_rate: f64,
    /// Mean-square decay, `rho`.
    pub decay: f64,
    pub momentum: f64,
    pub epsilon: f64,
}

impl Default for RmsPropConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            decay: 0.9,
            momentum: 0.0,
            epsilon: 1e-10,
        }
    }
}

setters!(RmsPropConfig {
    learning_rate => with_learning_rate,
    decay => with_decay,
    momentum => with_momentum,
    epsilon => with_epsilon,
});

/// Column-norm constraint on a weight matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxWeightColNormConfig {
    /// Largest squared column norm left untouched.
    pub threshold: f32,
}

impl Default for MaxWeightColNormConfig {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

impl MaxWeightColNormConfig {
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// One of the rule configurations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerConfig {
    GradientDescent(GradientDescentConfig),
    Adagrad(AdagradConfig),
    Adadelta(AdadeltaConfig),
    Momentum(MomentumConfig),
    Adam(AdamConfig),
    RmsProp(RmsPropConfig),
    MaxWeightColNorm(MaxWeightColNormConfig),
}

impl OptimizerConfig {
    /// Default configuration for a short optimizer name.
    ///
    /// Accepts `gd`, `momentum`, `adagrad`, `adadelta`, `adam`, `rmsprop` and
    /// `max_weight_col_norm`, case-insensitively.
    ///
    /// # Errors
    ///
    /// [`ApplyError::UnknownOptimizer`] for any other name.
    pub fn from_name(name: &str) -> Result<Self, ApplyError> {
        Ok(match name.to_ascii_lowercase().as_str() {
            "gd" | "sgd" => Self::GradientDescent(Default::default()),
            "momentum" => Self::Momentum(Default::default()),
            "adagrad" => Self::Adagrad(Default::default()),
            "adadelta" => Self::Adadelta(Default::default()),
            "adam" => Self::Adam(Default::default()),
            "rmsprop" => Self::RmsProp(Default::default()),
            "max_weight_col_norm" => Self::MaxWeightColNorm(Default::default()),
            _ => return Err(ApplyError::UnknownOptimizer(name.to_owned())),
        })
    }

    /// The operation this configuration drives.
    pub const fn op(&self) -> OpKind {
        match self {
            Self::GradientDescent(_) => OpKind::ApplyGradientDescent,
            Self::Adagrad(_) => OpKind::ApplyAdagrad,
            Self::Adadelta(_) => OpKind::ApplyAdadelta,
            Self::Momentum(_) => OpKind::ApplyMomentum,
            Self::Adam(_) => OpKind::ApplyAdam,
            Self::RmsProp(_) => OpKind::ApplyRMSProp,
            Self::MaxWeightColNorm(_) => OpKind::ApplyMaxWeightColNorm,
        }
    }

    /// The learning rate, or `None` for the column-norm constraint.
    pub const fn learning_rate(&self) -> Option<f64> {
        match self {
            Self::GradientDescent(c) => Some(c.learning_rate),
            Self::Adagrad(c) => Some(c.learning_rate),
            Self::Adadelta(c) => Some(c.learning_rate),
            Self::Momentum(c) => Some(c.learning_rate),
            Self::Adam(c) => Some(c.learning_rate),
            Self::RmsProp(c) => Some(c.learning_rate),
            Self::MaxWeightColNorm(_) => None,
        }
    }
}

impl From<GradientDescentConfig> for OptimizerConfig {
    fn from(c: GradientDescentConfig) -> Self {
        Self::GradientDescent(c)
    }
}

impl From<AdagradConfig> for OptimizerConfig {
    fn from(c: AdagradConfig) -> Self {
        Self::Adagrad(c)
    }
}

impl From<AdadeltaConfig> for OptimizerConfig {
    fn from(c: AdadeltaConfig) -> Self {
        Self::Adadelta(c)
    }
}

impl From<MomentumConfig> for OptimizerConfig {
    fn from(c: MomentumConfig) -> Self {
        Self::Momentum(c)
    }
}

impl From<AdamConfig> for OptimizerConfig {
    fn from(c: AdamConfig) -> Self {
        Self::Adam(c)
    }
}

impl From<RmsPropConfig> for OptimizerConfig {
    fn from(c: RmsPropConfig) -> Self {
        Self::RmsProp(c)
    }
}

impl From<MaxWeightColNormConfig> for OptimizerConfig {
    fn from(c: MaxWeightColNormConfig) -> Self {
        Self::MaxWeightColNorm(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_defaults() {
        let adagrad = AdagradConfig::default();
        assert_eq!(adagrad.learning_rate, 0.1);
        assert_eq!(adagrad.initial_accumulator_value, 0.1);

        let adadelta = AdadeltaConfig::default();
        assert_eq!(
            (adadelta.learning_rate, adadelta.decay_rate, adadelta.epsilon),
            (1.0, 0.95, 1e-8)
        );

        let rms = RmsPropConfig::default();
        assert_eq!(rms.momentum, 0.0);
        assert_eq!(MaxWeightColNormConfig::default().threshold, 1.0);
    }

    #[test]
    fn setters_keep_other_fields() {
        let c = AdamConfig::default().with_beta2(0.98).with_epsilon(1e-6);
        assert_eq!(c.beta2, 0.98);
        assert_eq!(c.epsilon, 1e-6);
        assert_eq!(c.learning_rate, 0.001);
    }

    #[test]
    fn from_name() {
        assert_eq!(
            OptimizerConfig::from_name("Adam").unwrap(),
            OptimizerConfig::Adam(AdamConfig::default())
        );
        assert_eq!(
            OptimizerConfig::from_name("gd").unwrap().op(),
            OpKind::ApplyGradientDescent
        );
        assert_eq!(
            OptimizerConfig::from_name("lbfgs"),
            Err(ApplyError::UnknownOptimizer("lbfgs".into()))
        );
    }

    #[test]
    fn constraint_has_no_learning_rate() {
        let c: OptimizerConfig = MaxWeightColNormConfig::default().with_threshold(2.0).into();
        assert_eq!(c.learning_rate(), None);
        assert_eq!(c.op(), OpKind::ApplyMaxWeightColNorm);
    }
}
