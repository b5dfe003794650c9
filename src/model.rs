//! Per-class blend model
//!
//! The level-2 ensemble is a grouped linear blend: each class gets its
//! own weights over the level-1 models' predictions for that class,
//! plus a bias, with the output clamped to `[0, 1]`. Equivalent to a
//! 1x1 grouped convolution over the class-major feature layout.

use crate::optim::ParamGroup;
use crate::{Error, Result, Tensor};
use ndarray::Array2;
use rand::Rng;

/// Grouped per-class linear blend over stacked level-1 predictions.
///
/// For class `c` with `M` level-1 models:
/// `y_c = clamp(b_c + Σ_m w_{c,m} * x_{c,m}, 0, 1)`
///
/// Inputs are class-major: feature `c * M + m` is model `m`'s
/// prediction for class `c`, matching the stacked feature layout.
pub struct BlendModel {
    num_classes: usize,
    num_models: usize,
    /// `num_classes * num_models` weights, class-major
    weight: Tensor,
    /// One bias per class
    bias: Tensor,
}

impl BlendModel {
    /// Create a model with uniform init scaled by the per-class fan-in
    pub fn new<R: Rng>(num_classes: usize, num_models: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (num_models as f32).sqrt();
        let weight: Vec<f32> =
            (0..num_classes * num_models).map(|_| rng.gen_range(-bound..bound)).collect();
        let bias: Vec<f32> = (0..num_classes).map(|_| rng.gen_range(-bound..bound)).collect();

        Self {
            num_classes,
            num_models,
            weight: Tensor::from_vec(weight, true),
            bias: Tensor::from_vec(bias, true),
        }
    }

    /// Number of label classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Number of level-1 models blended per class
    pub fn num_models(&self) -> usize {
        self.num_models
    }

    fn pre_activation(&self, inputs: &Array2<f32>) -> Array2<f32> {
        let weight = self.weight.data();
        let bias = self.bias.data();
        let m = self.num_models;

        Array2::from_shape_fn((inputs.nrows(), self.num_classes), |(s, c)| {
            let mut z = bias[c];
            for j in 0..m {
                z += weight[c * m + j] * inputs[[s, c * m + j]];
            }
            z
        })
    }

    /// Forward pass: blended predictions clamped to `[0, 1]`,
    /// `batch x num_classes`
    pub fn forward(&self, inputs: &Array2<f32>) -> Array2<f32> {
        self.pre_activation(inputs).mapv(|z| z.clamp(0.0, 1.0))
    }

    /// Accumulate parameter gradients for a batch.
    ///
    /// `grad_output` is dL/dy at the clamped output; positions clamped
    /// away from `[0, 1]` pass no gradient.
    pub fn backward(&self, inputs: &Array2<f32>, grad_output: &Array2<f32>) {
        let z = self.pre_activation(inputs);
        let m = self.num_models;

        let mut grad_w = vec![0.0f32; self.num_classes * m];
        let mut grad_b = vec![0.0f32; self.num_classes];

        for s in 0..inputs.nrows() {
            for c in 0..self.num_classes {
                let zv = z[[s, c]];
                if !(0.0..=1.0).contains(&zv) {
                    continue;
                }
                let g = grad_output[[s, c]];
                grad_b[c] += g;
                for j in 0..m {
                    grad_w[c * m + j] += g * inputs[[s, c * m + j]];
                }
            }
        }

        self.weight.accumulate_grad(&ndarray::Array1::from(grad_w));
        self.bias.accumulate_grad(&ndarray::Array1::from(grad_b));
    }

    /// Handles to the trainable parameters (weight, then bias)
    pub fn params(&self) -> Vec<Tensor> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    /// Build the optimizer's parameter groups; the returned tensors
    /// alias the model's parameters
    pub fn param_groups(&self, lr: f32, weight_decay: f32) -> Vec<ParamGroup> {
        vec![ParamGroup::new(self.params(), lr, weight_decay)]
    }

    /// Copy the weights out for checkpointing
    pub fn weight_data(&self) -> Vec<f32> {
        self.weight.to_vec()
    }

    /// Copy the biases out for checkpointing
    pub fn bias_data(&self) -> Vec<f32> {
        self.bias.to_vec()
    }

    /// Restore parameters from a checkpoint
    pub fn set_parameters(&self, weight: &[f32], bias: &[f32]) -> Result<()> {
        if weight.len() != self.num_classes * self.num_models || bias.len() != self.num_classes {
            return Err(Error::DataError(format!(
                "checkpoint shape mismatch: weight {} bias {} for a {}x{} model",
                weight.len(),
                bias.len(),
                self.num_classes,
                self.num_models
            )));
        }
        self.weight.data_mut().assign(&ndarray::Array1::from(weight.to_vec()));
        self.bias.data_mut().assign(&ndarray::Array1::from(bias.to_vec()));
        Ok(())
    }
}
