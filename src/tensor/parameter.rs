use std::{
    fmt::{self, Display},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ndarray::{Array, ArrayD, Dimension};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Gradient, ops};
use crate::Result;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A process-unique identity for a `Parameter`, shared by all of its handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

impl ParamId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value of this id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The value of a parameter and the gradient currently attached to it.
#[derive(Debug)]
pub(crate) struct ParamSlot {
    pub(crate) value: ArrayD<f32>,
    pub(crate) grad: Option<Gradient>,
}

/// A handle to a trainable tensor.
///
/// Cloning the handle doesn't copy the tensor, every clone points to the same storage
/// and shares the same `ParamId`. The owner of the model keeps one handle to write
/// gradients and read values, while an optimizer holds another to update it in place.
#[derive(Debug, Clone)]
pub struct Parameter {
    id: ParamId,
    slot: Arc<RwLock<ParamSlot>>,
}

impl Parameter {
    /// Creates a new `Parameter` without a gradient.
    ///
    /// # Arguments
    /// * `value` - The initial value of the parameter, of any dimensionality.
    ///
    /// # Returns
    /// A new `Parameter` instance with a fresh id.
    pub fn new<D: Dimension>(value: Array<f32, D>) -> Self {
        Self {
            id: ParamId::next(),
            slot: Arc::new(RwLock::new(ParamSlot {
                value: value.into_dyn(),
                grad: None,
            })),
        }
    }

    /// Creates a new one dimensional `Parameter` from a vector of values.
    pub fn from_vec(values: Vec<f32>) -> Self {
        Self::new(Array::from_vec(values))
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    /// Returns a read guard over the parameter's current value.
    ///
    /// The guard must be dropped before the optimizer can step over this parameter.
    pub fn value(&self) -> MappedRwLockReadGuard<'_, ArrayD<f32>> {
        RwLockReadGuard::map(self.slot.read(), |slot| &slot.value)
    }

    /// Returns a read guard over the gradient attached to the parameter, if any.
    pub fn grad(&self) -> MappedRwLockReadGuard<'_, Option<Gradient>> {
        RwLockReadGuard::map(self.slot.read(), |slot| &slot.grad)
    }

    /// Attaches a gradient to the parameter, replacing the previous one.
    ///
    /// # Arguments
    /// * `grad` - The new gradient, either dense or sparse.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the gradient's shape differs from the parameter's.
    pub fn set_grad(&self, grad: impl Into<Gradient>) -> Result<()> {
        let grad = grad.into();
        let mut slot = self.slot.write();
        ops::ensure_same_shape("gradient", grad.shape(), slot.value.shape())?;
        slot.grad = Some(grad);
        Ok(())
    }

    /// Detaches the gradient from the parameter.
    pub fn clear_grad(&self) {
        self.slot.write().grad = None;
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ParamSlot> {
        self.slot.write()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;
    use crate::{OptimErr, tensor::SparseGradient};

    #[test]
    fn test_clones_share_storage_and_id() {
        let param = Parameter::from_vec(vec![1., 2.]);
        let other = param.clone();

        other.set_grad(array![0.5_f32, 0.5]).unwrap();
        param.write().value[0] = 3.;

        assert_eq!(param.id(), other.id());
        assert_eq!(other.value()[0], 3.);
        assert!(param.grad().is_some());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Parameter::from_vec(vec![0.]);
        let b = Parameter::from_vec(vec![0.]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_set_grad_rejects_wrong_shape() {
        let param = Parameter::new(Array2::<f32>::zeros((2, 3)));

        let err = param.set_grad(Array2::<f32>::zeros((3, 2))).unwrap_err();
        assert!(matches!(err, OptimErr::ShapeMismatch { .. }));
        assert!(param.grad().is_none());

        let sparse = SparseGradient::new(vec![2, 3], vec![vec![1, 2]], vec![1.]).unwrap();
        param.set_grad(sparse).unwrap();
        assert!(matches!(*param.grad(), Some(Gradient::Sparse(_))));
    }

    #[test]
    fn test_clear_grad() {
        let param = Parameter::from_vec(vec![1.]);
        param.set_grad(array![1_f32]).unwrap();
        param.clear_grad();
        assert!(param.grad().is_none());
    }
}
