use ndarray::{Array, ArrayD, Dimension};

use crate::{OptimErr, Result};

/// The gradient of the loss with respect to a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Gradient {
    Dense(ArrayD<f32>),
    Sparse(SparseGradient),
}

impl Gradient {
    pub fn shape(&self) -> &[usize] {
        match self {
            Gradient::Dense(grad) => grad.shape(),
            Gradient::Sparse(grad) => grad.shape(),
        }
    }

    /// Returns the dense representation of the gradient, `None` if it's sparse.
    pub fn as_dense(&self) -> Option<&ArrayD<f32>> {
        match self {
            Gradient::Dense(grad) => Some(grad),
            Gradient::Sparse(_) => None,
        }
    }
}

impl<D: Dimension> From<Array<f32, D>> for Gradient {
    fn from(value: Array<f32, D>) -> Self {
        Gradient::Dense(value.into_dyn())
    }
}

impl From<SparseGradient> for Gradient {
    fn from(value: SparseGradient) -> Self {
        Gradient::Sparse(value)
    }
}

/// A gradient stored in coordinate format, only the non zero entries are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseGradient {
    shape: Vec<usize>,
    entries: Vec<(Vec<usize>, f32)>,
}

impl SparseGradient {
    /// Creates a new `SparseGradient`.
    ///
    /// # Arguments
    /// * `shape` - The shape of the dense tensor this gradient represents.
    /// * `indices` - One multi-dimensional index per stored value.
    /// * `values` - The stored values.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the amount of indices and values differ or if any of the
    /// indices doesn't fit in `shape`.
    pub fn new(shape: Vec<usize>, indices: Vec<Vec<usize>>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(OptimErr::ShapeMismatch {
                what: "sparse indices",
                got: vec![indices.len()],
                expected: vec![values.len()],
            });
        }

        let out_of_bounds = |idx: &Vec<usize>| {
            idx.len() != shape.len() || idx.iter().zip(&shape).any(|(i, dim)| i >= dim)
        };

        if let Some(idx) = indices.iter().find(|idx| out_of_bounds(idx)) {
            return Err(OptimErr::ShapeMismatch {
                what: "sparse index",
                got: idx.clone(),
                expected: shape,
            });
        }

        Ok(Self {
            shape,
            entries: indices.into_iter().zip(values).collect(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the amount of stored entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_sparse_keeps_every_entry() {
        let grad = Gradient::from(
            SparseGradient::new(
                vec![2, 2],
                vec![vec![0, 1], vec![1, 0], vec![0, 1]],
                vec![1., 2., 3.],
            )
            .unwrap(),
        );

        assert_eq!(grad.shape(), &[2, 2]);
        assert!(grad.as_dense().is_none());
        assert!(matches!(grad, Gradient::Sparse(ref sparse) if sparse.nnz() == 3));
    }

    #[test]
    fn test_sparse_rejects_out_of_bounds_index() {
        let err = SparseGradient::new(vec![2, 2], vec![vec![2, 0]], vec![1.]).unwrap_err();
        assert!(matches!(err, OptimErr::ShapeMismatch { what: "sparse index", .. }));

        let err = SparseGradient::new(vec![2, 2], vec![vec![0]], vec![1.]).unwrap_err();
        assert!(matches!(err, OptimErr::ShapeMismatch { .. }));
    }

    #[test]
    fn test_sparse_rejects_length_mismatch() {
        let err = SparseGradient::new(vec![3], vec![vec![0], vec![1]], vec![1.]).unwrap_err();
        assert!(matches!(err, OptimErr::ShapeMismatch { what: "sparse indices", .. }));
    }

    #[test]
    fn test_dense_gradient_accessors() {
        let grad = Gradient::from(array![[1_f32, 2.], [3., 4.]]);

        assert_eq!(grad.shape(), &[2, 2]);
        assert!(grad.as_dense().is_some());
    }
}
