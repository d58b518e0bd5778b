use std::env;

use adam_optim::{AdamConfig, AdamOptimizer, Parameter};
use anyhow::{Context, Result};
use log::info;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SAMPLES: usize = 64;
const TRUE_WEIGHTS: [f32; 3] = [3., -2., 0.5];
const TRUE_BIAS: f32 = 1.;

/// Fits a linear model with Adam.
///
/// Usage: `adam_optim [config.json] [steps]`
fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);

    let config = match args.next() {
        Some(path) => AdamConfig::from_path(&path).with_context(|| format!("loading {path}"))?,
        None => AdamConfig::default().with_lr(0.05),
    };

    let steps: usize = match args.next() {
        Some(steps) => steps.parse().context("steps must be a positive integer")?,
        None => 1000,
    };

    let mut rng = StdRng::seed_from_u64(7);
    let x = Array2::<f32>::from_shape_fn((SAMPLES, TRUE_WEIGHTS.len()), |_| {
        rng.random_range(-1.0..1.0)
    });
    let y = x.dot(&Array1::from(TRUE_WEIGHTS.to_vec())) + TRUE_BIAS;

    let weights = Parameter::new(Array1::<f32>::zeros(TRUE_WEIGHTS.len()));
    let bias = Parameter::new(Array1::<f32>::zeros(1));

    let mut optimizer = AdamOptimizer::adam(vec![weights.clone()], config)?;
    optimizer.add_param_group_with(vec![bias.clone()], config.with_weight_decay(0.))?;

    info!("fitting {SAMPLES} samples for {steps} steps with {config:?}");

    let mut loss = f32::INFINITY;
    for step in 0..steps {
        loss = optimizer.try_step_with(|| mse_and_grads(&x, &y, &weights, &bias))?;

        if step % 100 == 0 {
            info!(step = step, loss = loss; "training");
        }
    }

    info!(loss = loss; "finished");
    println!("weights = {}", *weights.value());
    println!("bias = {}", *bias.value());
    Ok(())
}

/// Computes the mean squared error of the model and attaches its gradients.
fn mse_and_grads(
    x: &Array2<f32>,
    y: &Array1<f32>,
    weights: &Parameter,
    bias: &Parameter,
) -> Result<f32> {
    let w: Array1<f32> = weights.value().iter().copied().collect();
    let b = bias.value().iter().sum::<f32>();

    let residual = x.dot(&w) + b - y;
    let n = SAMPLES as f32;

    let grad_w = x.t().dot(&residual) * (2. / n);
    let grad_b = Array1::from_elem(1, residual.sum() * 2. / n);

    weights.set_grad(grad_w)?;
    bias.set_grad(grad_b)?;

    Ok(residual.mapv(|r| r * r).sum() / n)
}
