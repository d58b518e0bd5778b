use std::borrow::Cow;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use super::{GroupedOptimizer, UpdateRule};
use crate::{
    AdamConfig, Result,
    tensor::{Parameter, ops},
};

/// The Adam optimization algorithm, from "Adam: A Method for Stochastic Optimization".
///
/// Keeps an exponential moving average of the gradient and of its square per parameter
/// and uses them to rescale every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct Adam;

/// An optimizer running `Adam` over groups of parameters.
pub type AdamOptimizer = GroupedOptimizer<Adam>;

/// The state kept by `Adam` for a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdamState {
    /// The amount of updates applied to the parameter.
    pub step: u64,
    /// Running average of the gradient.
    pub exp_avg: ArrayD<f32>,
    /// Running average of the squared gradient.
    pub exp_avg_sq: ArrayD<f32>,
}

impl AdamState {
    /// Creates the state of a parameter that was never updated.
    ///
    /// # Arguments
    /// * `shape` - The shape of the parameter.
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            step: 0,
            exp_avg: ArrayD::zeros(shape),
            exp_avg_sq: ArrayD::zeros(shape),
        }
    }
}

/// Computes both bias corrections, `1 - beta1^step` and `1 - beta2^step`.
///
/// # Arguments
/// * `betas` - The decay rates of the running averages.
/// * `step` - The amount of updates applied so far, including the current one.
pub fn bias_corrections((beta1, beta2): (f64, f64), step: u64) -> (f64, f64) {
    let t = i32::try_from(step).unwrap_or(i32::MAX);
    (1. - beta1.powi(t), 1. - beta2.powi(t))
}

/// Computes the bias corrected step size, `lr * sqrt(1 - beta2^step) / (1 - beta1^step)`.
///
/// Tends to `lr` as `step` grows. Undefined for `step == 0`.
pub fn step_size(lr: f64, betas: (f64, f64), step: u64) -> f64 {
    let (bc1, bc2) = bias_corrections(betas, step);
    lr * bc2.sqrt() / bc1
}

/// Applies a single Adam update to `param`.
///
/// The gradient is left untouched, weight decay is folded into a copy of it.
///
/// # Arguments
/// * `config` - The hyperparameters.
/// * `state` - The parameter's running averages and step counter.
/// * `param` - The parameter to update.
/// * `grad` - The gradient of the loss with respect to `param`.
///
/// # Panics
/// If `grad` or any of the running averages in `state` doesn't have the shape of `param`.
pub fn adam_update(
    config: &AdamConfig,
    state: &mut AdamState,
    param: &mut ArrayD<f32>,
    grad: &ArrayD<f32>,
) {
    let AdamConfig {
        lr,
        betas: (beta1, beta2),
        eps,
        weight_decay,
    } = *config;

    state.step += 1;

    let grad = if weight_decay != 0. {
        Cow::Owned(ops::add_scaled(grad, weight_decay as f32, param))
    } else {
        Cow::Borrowed(grad)
    };

    ops::mul_(&mut state.exp_avg, beta1 as f32);
    ops::add_scaled_(&mut state.exp_avg, (1. - beta1) as f32, &grad);

    ops::mul_(&mut state.exp_avg_sq, beta2 as f32);
    ops::addcmul_(&mut state.exp_avg_sq, (1. - beta2) as f32, &grad, &grad);

    let mut denom = ops::sqrt(&state.exp_avg_sq);
    ops::add_scalar_(&mut denom, eps as f32);

    let lr_t = step_size(lr, (beta1, beta2), state.step);
    ops::addcdiv_(param, -lr_t as f32, &state.exp_avg, &denom);
}

impl UpdateRule for Adam {
    type Hyper = AdamConfig;
    type State = AdamState;

    fn validate_hyper(&self, hyper: &AdamConfig) -> Result<()> {
        hyper.validate()
    }

    fn init_state(&self, param: &ArrayD<f32>) -> AdamState {
        AdamState::zeros(param.shape())
    }

    fn check_state(&self, state: &AdamState, param: &ArrayD<f32>) -> Result<()> {
        ops::ensure_same_shape("exp_avg", state.exp_avg.shape(), param.shape())?;
        ops::ensure_same_shape("exp_avg_sq", state.exp_avg_sq.shape(), param.shape())
    }

    fn update(
        &self,
        hyper: &AdamConfig,
        state: &mut AdamState,
        param: &mut ArrayD<f32>,
        grad: &ArrayD<f32>,
    ) {
        adam_update(hyper, state, param, grad);
    }
}

impl GroupedOptimizer<Adam> {
    /// Creates a new Adam optimizer with a single parameter group.
    ///
    /// # Arguments
    /// * `params` - The parameters of the first group.
    /// * `config` - The default hyperparameters, used by every group added without its own.
    ///
    /// # Returns
    /// An error if `config` is invalid or if `params` contains the same parameter twice.
    pub fn adam(params: Vec<Parameter>, config: AdamConfig) -> Result<Self> {
        Self::new(Adam, params, config)
    }
}
