//! Loss functions
//!
//! The blend model outputs probabilities already clamped to `[0, 1]`,
//! so the binary cross-entropy here works on probabilities with an
//! epsilon guard rather than on logits.

use crate::config::LossConfig;
use crate::{Error, Result};
use ndarray::Array2;

const EPS: f32 = 1e-7;

/// A loss over batched predictions and multi-hot targets, with an
/// analytic gradient
pub trait Loss {
    /// Mean loss over all elements
    fn loss(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> f32;

    /// dL/dprediction, same shape as the predictions
    fn grad(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32>;

    /// Loss name for logging
    fn name(&self) -> &'static str;
}

/// Binary cross-entropy on clamped probabilities.
///
/// `L = -mean(t * ln(p + ε) + (1 - t) * ln(1 - p + ε))`
pub struct Bce;

impl Loss for Bce {
    fn loss(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> f32 {
        assert_eq!(
            predictions.dim(),
            targets.dim(),
            "predictions and targets must have same shape"
        );

        let n = predictions.len() as f32;
        let total: f32 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(&p, &t)| -(t * (p + EPS).ln() + (1.0 - t) * (1.0 - p + EPS).ln()))
            .sum();
        total / n
    }

    fn grad(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32> {
        assert_eq!(predictions.dim(), targets.dim());

        let n = predictions.len() as f32;
        let mut grad = predictions.clone();
        grad.zip_mut_with(targets, |p, &t| {
            *p = (-(t / (*p + EPS)) + (1.0 - t) / (1.0 - *p + EPS)) / n;
        });
        grad
    }

    fn name(&self) -> &'static str {
        "bce"
    }
}

/// Mean squared error
pub struct Mse;

impl Loss for Mse {
    fn loss(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> f32 {
        assert_eq!(predictions.dim(), targets.dim());

        let n = predictions.len() as f32;
        predictions
            .iter()
            .zip(targets.iter())
            .map(|(&p, &t)| (p - t) * (p - t))
            .sum::<f32>()
            / n
    }

    fn grad(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32> {
        let n = predictions.len() as f32;
        (predictions - targets) * (2.0 / n)
    }

    fn name(&self) -> &'static str {
        "mse"
    }
}

/// Build a loss from its configuration
pub fn build_loss(cfg: &LossConfig) -> Result<Box<dyn Loss>> {
    match cfg.name.as_str() {
        "bce" => Ok(Box::new(Bce)),
        "mse" => Ok(Box::new(Mse)),
        other => Err(Error::ConfigError(format!("unknown loss '{other}'"))),
    }
}
