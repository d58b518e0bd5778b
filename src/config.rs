use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{OptimErr, Result};

/// The hyperparameters of the Adam algorithm.
///
/// Every field falls back to its default when missing from a serialized config. The
/// scalars are kept in double precision and only rounded to `f32` when applied to a
/// tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdamConfig {
    /// Step size multiplier.
    pub lr: f64,
    /// Decay rates of the first and second moment running averages.
    pub betas: (f64, f64),
    /// Added to the denominator for numerical stability.
    pub eps: f64,
    /// L2 penalty folded into the gradient before the moment updates.
    pub weight_decay: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            betas: (0.9, 0.999),
            eps: 1e-8,
            weight_decay: 0.,
        }
    }
}

impl AdamConfig {
    pub fn with_lr(self, lr: f64) -> Self {
        Self { lr, ..self }
    }

    pub fn with_betas(self, beta1: f64, beta2: f64) -> Self {
        Self {
            betas: (beta1, beta2),
            ..self
        }
    }

    pub fn with_eps(self, eps: f64) -> Self {
        Self { eps, ..self }
    }

    pub fn with_weight_decay(self, weight_decay: f64) -> Self {
        Self {
            weight_decay,
            ..self
        }
    }

    /// Checks that every hyperparameter is inside its domain.
    ///
    /// # Returns
    /// An `InvalidHyperparameter` error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let (beta1, beta2) = self.betas;
        let in_unit = |b: f64| (0. ..1.).contains(&b);

        let checks = [
            ("lr", self.lr, self.lr > 0.),
            ("beta1", beta1, in_unit(beta1)),
            ("beta2", beta2, in_unit(beta2)),
            ("eps", self.eps, self.eps > 0.),
            ("weight_decay", self.weight_decay, self.weight_decay >= 0.),
        ];

        match checks.into_iter().find(|&(.., ok)| !ok) {
            Some((name, value, _)) => Err(OptimErr::InvalidHyperparameter { name, value }),
            None => Ok(()),
        }
    }

    /// Parses and validates a JSON config.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdamConfig::default();

        assert_eq!(config.lr, 1e-3);
        assert_eq!(config.betas, (0.9, 0.999));
        assert_eq!(config.eps, 1e-8);
        assert_eq!(config.weight_decay, 0.);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AdamConfig::from_json_str(r#"{ "lr": 0.01, "betas": [0.8, 0.99] }"#).unwrap();

        assert_eq!(config.lr, 0.01);
        assert_eq!(config.betas, (0.8, 0.99));
        assert_eq!(config.eps, 1e-8);
        assert_eq!(config.weight_decay, 0.);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = AdamConfig::from_json_str(r#"{ "momentum": 0.9 }"#).unwrap_err();
        assert!(matches!(err, OptimErr::Config(_)));
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let cases = [
            (AdamConfig::default().with_lr(0.), "lr"),
            (AdamConfig::default().with_lr(f64::NAN), "lr"),
            (AdamConfig::default().with_betas(1., 0.999), "beta1"),
            (AdamConfig::default().with_betas(0.9, -0.1), "beta2"),
            (AdamConfig::default().with_eps(0.), "eps"),
            (AdamConfig::default().with_weight_decay(-1e-2), "weight_decay"),
        ];

        for (config, field) in cases {
            match config.validate() {
                Err(OptimErr::InvalidHyperparameter { name, .. }) => assert_eq!(name, field),
                other => panic!("expected invalid {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_json_with_invalid_value_is_rejected() {
        let err = AdamConfig::from_json_str(r#"{ "eps": -1.0 }"#).unwrap_err();
        assert!(matches!(err, OptimErr::InvalidHyperparameter { name: "eps", .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = AdamConfig::from_path("/nonexistent/adam.json").unwrap_err();
        assert!(matches!(err, OptimErr::Config(_)));
    }
}
