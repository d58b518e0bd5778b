use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use crate::tensor::ParamId;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, OptimErr>;

/// The optimization crate's error type.
#[derive(Debug)]
pub enum OptimErr {
    /// The gradient attached to a parameter is stored in sparse form.
    UnsupportedGradientFormat { param: ParamId },
    ShapeMismatch {
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    InvalidHyperparameter {
        name: &'static str,
        value: f64,
    },
    DuplicateParameter {
        param: ParamId,
    },
    NoSuchGroup {
        group: usize,
        groups: usize,
    },
    StateDictMismatch(String),
    Config(String),
}

impl Display for OptimErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptimErr::UnsupportedGradientFormat { param } => format!(
                "Parameter {param} has a sparse gradient, dense gradients required; use a sparse-gradient variant"
            ),
            OptimErr::ShapeMismatch {
                what,
                got,
                expected,
            } => format!("Shape mismatch for {what}, got {got:?} and expected {expected:?}"),
            OptimErr::InvalidHyperparameter { name, value } => {
                format!("Invalid value for hyperparameter {name}: {value}")
            }
            OptimErr::DuplicateParameter { param } => {
                format!("Parameter {param} already belongs to a parameter group")
            }
            OptimErr::NoSuchGroup { group, groups } => {
                format!("There's no parameter group {group}, the optimizer has {groups}")
            }
            OptimErr::StateDictMismatch(msg) => format!("The given state dict doesn't fit: {msg}"),
            OptimErr::Config(msg) => format!("Failed to load config: {msg}"),
        };

        write!(f, "{s}")
    }
}

impl Error for OptimErr {}

impl From<serde_json::Error> for OptimErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<io::Error> for OptimErr {
    fn from(value: io::Error) -> Self {
        Self::Config(value.to_string())
    }
}
