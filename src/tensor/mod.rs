mod gradient;
pub mod ops;
mod parameter;

pub use gradient::{Gradient, SparseGradient};
pub(crate) use parameter::ParamSlot;
pub use parameter::{ParamId, Parameter};
