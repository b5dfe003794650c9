//! SGD optimizer with momentum

use super::{Optimizer, ParamGroup};
use ndarray::Array1;

/// Stochastic gradient descent over parameter groups.
///
/// Weight decay is decoupled from the gradient update and read from
/// each group, so a scheduler rescaling `group.weight_decay` changes
/// the decay applied at the next step:
///
/// θ_t = (1 - lr * λ) * θ_{t-1} - lr * v_t
/// v_t = μ * v_{t-1} + g_t
pub struct Sgd {
    groups: Vec<ParamGroup>,
    momentum: f32,
    velocity: Vec<Vec<Option<Array1<f32>>>>,
}

impl Sgd {
    /// Create a new SGD optimizer owning the given parameter groups
    pub fn new(groups: Vec<ParamGroup>, momentum: f32) -> Self {
        let velocity = groups.iter().map(|g| vec![None; g.params.len()]).collect();
        Self { groups, momentum, velocity }
    }

    /// Momentum hyperparameter
    #[must_use]
    pub fn momentum(&self) -> f32 {
        self.momentum
    }
}

impl Optimizer for Sgd {
    fn step(&mut self) {
        for (group, buffers) in self.groups.iter().zip(self.velocity.iter_mut()) {
            let decay_factor = 1.0 - group.lr * group.weight_decay;

            for (param, buffer) in group.params.iter().zip(buffers.iter_mut()) {
                if let Some(grad) = param.grad() {
                    let update = if self.momentum > 0.0 {
                        let v = match buffer.take() {
                            Some(v) => v * self.momentum + &grad,
                            None => grad,
                        };
                        *buffer = Some(v.clone());
                        v
                    } else {
                        grad
                    };

                    let mut data = param.data_mut();
                    *data = &*data * decay_factor - &(update * group.lr);
                }
            }
        }
    }

    fn param_groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        &mut self.groups
    }
}
