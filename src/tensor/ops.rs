//! Elementwise kernels over dense `f32` tensors.
//!
//! Functions whose name ends with `_` mutate their first argument in place, the rest
//! allocate a new tensor. Every element goes through the same arithmetic regardless of
//! whether the kernel runs sequentially or on the rayon pool, so the result doesn't
//! depend on the tensor's size.
//!
//! All binary kernels panic if the operands' shapes differ, callers are expected to
//! check with `ensure_same_shape` first.

use ndarray::{ArrayD, Zip};

use crate::{OptimErr, Result};

/// Tensors with at least this many elements are processed on the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 1 << 14;

/// Checks that two shapes are equal.
///
/// # Arguments
/// * `what` - What is being checked, used in the error.
/// * `got` - The observed shape.
/// * `expected` - The shape `got` should have.
pub fn ensure_same_shape(what: &'static str, got: &[usize], expected: &[usize]) -> Result<()> {
    if got != expected {
        return Err(OptimErr::ShapeMismatch {
            what,
            got: got.to_vec(),
            expected: expected.to_vec(),
        });
    }

    Ok(())
}

fn map_inplace<F>(x: &mut ArrayD<f32>, f: F)
where
    F: Fn(f32) -> f32 + Sync + Send,
{
    if x.len() >= PARALLEL_THRESHOLD {
        x.par_mapv_inplace(f);
    } else {
        x.mapv_inplace(f);
    }
}

fn zip2_inplace<F>(x: &mut ArrayD<f32>, y: &ArrayD<f32>, f: F)
where
    F: Fn(&mut f32, f32) + Sync + Send,
{
    let zip = Zip::from(x).and(y);

    if zip.size() >= PARALLEL_THRESHOLD {
        zip.par_for_each(|x, &y| f(x, y));
    } else {
        zip.for_each(|x, &y| f(x, y));
    }
}

fn zip3_inplace<F>(x: &mut ArrayD<f32>, t1: &ArrayD<f32>, t2: &ArrayD<f32>, f: F)
where
    F: Fn(&mut f32, f32, f32) + Sync + Send,
{
    let zip = Zip::from(x).and(t1).and(t2);

    if zip.size() >= PARALLEL_THRESHOLD {
        zip.par_for_each(|x, &a, &b| f(x, a, b));
    } else {
        zip.for_each(|x, &a, &b| f(x, a, b));
    }
}

/// `x = x * a`
pub fn mul_(x: &mut ArrayD<f32>, a: f32) {
    map_inplace(x, move |v| v * a);
}

/// `x = x + s`
pub fn add_scalar_(x: &mut ArrayD<f32>, s: f32) {
    map_inplace(x, move |v| v + s);
}

/// `x = x + alpha * y`
pub fn add_scaled_(x: &mut ArrayD<f32>, alpha: f32, y: &ArrayD<f32>) {
    zip2_inplace(x, y, move |x, y| *x += alpha * y);
}

/// Allocating variant of `add_scaled_`, returns `x + alpha * y`.
pub fn add_scaled(x: &ArrayD<f32>, alpha: f32, y: &ArrayD<f32>) -> ArrayD<f32> {
    let mut out = x.clone();
    add_scaled_(&mut out, alpha, y);
    out
}

/// `x = x + value * t1 * t2`
pub fn addcmul_(x: &mut ArrayD<f32>, value: f32, t1: &ArrayD<f32>, t2: &ArrayD<f32>) {
    zip3_inplace(x, t1, t2, move |x, a, b| *x += value * a * b);
}

/// `x = x + value * (t1 / t2)`, the quotient is computed before scaling.
pub fn addcdiv_(x: &mut ArrayD<f32>, value: f32, t1: &ArrayD<f32>, t2: &ArrayD<f32>) {
    zip3_inplace(x, t1, t2, move |x, a, b| *x += value * (a / b));
}

/// Returns the elementwise square root of `x`.
pub fn sqrt(x: &ArrayD<f32>) -> ArrayD<f32> {
    let mut out = x.clone();
    map_inplace(&mut out, f32::sqrt);
    out
}
