pub mod config;
pub mod error;
pub mod optimization;
pub(crate) mod storage;
pub mod tensor;

pub use config::AdamConfig;
pub use error::{OptimErr, Result};
pub use optimization::{
    Adam, AdamOptimizer, AdamState, GroupedOptimizer, ParamGroup, StateDict, UpdateRule,
};
pub use tensor::{Gradient, ParamId, Parameter, SparseGradient};
