//! Adam optimizer with decoupled weight decay

use super::{Optimizer, ParamGroup};
use ndarray::Array1;

/// Adam over parameter groups, with weight decay applied directly to
/// the parameters rather than folded into the gradient:
///
/// m_t = β1 * m_{t-1} + (1 - β1) * g
/// v_t = β2 * v_{t-1} + (1 - β2) * g²
/// θ_t = (1 - lr * λ) * θ_{t-1} - lr_t * m_t / (√v_t + ε)
///
/// where `lr_t` carries the bias correction and `lr`/`λ` are read from
/// each group at step time.
pub struct Adam {
    groups: Vec<ParamGroup>,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Vec<Option<Array1<f32>>>>,
    v: Vec<Vec<Option<Array1<f32>>>>,
}

impl Adam {
    /// Create a new Adam optimizer owning the given parameter groups
    pub fn new(groups: Vec<ParamGroup>, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        let m = groups.iter().map(|g| vec![None; g.params.len()]).collect();
        let v = groups.iter().map(|g| vec![None; g.params.len()]).collect();
        Self { groups, beta1, beta2, epsilon, t: 0, m, v }
    }

    /// Create Adam with the usual defaults (β1=0.9, β2=0.999, ε=1e-8)
    pub fn default_params(groups: Vec<ParamGroup>) -> Self {
        Self::new(groups, 0.9, 0.999, 1e-8)
    }

    /// Optimizer step counter
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self) {
        self.t += 1;

        // Bias correction folded into the step size
        let correction = (1.0 - self.beta2.powi(self.t as i32)).sqrt()
            / (1.0 - self.beta1.powi(self.t as i32));

        for ((group, m_buffers), v_buffers) in
            self.groups.iter().zip(self.m.iter_mut()).zip(self.v.iter_mut())
        {
            let lr_t = group.lr * correction;
            let decay_factor = 1.0 - group.lr * group.weight_decay;

            for ((param, m_cell), v_cell) in
                group.params.iter().zip(m_buffers.iter_mut()).zip(v_buffers.iter_mut())
            {
                if let Some(grad) = param.grad() {
                    let m_t = match m_cell.take() {
                        Some(m) => m * self.beta1 + &grad * (1.0 - self.beta1),
                        None => &grad * (1.0 - self.beta1),
                    };

                    let grad_sq = &grad * &grad;
                    let v_t = match v_cell.take() {
                        Some(v) => v * self.beta2 + &grad_sq * (1.0 - self.beta2),
                        None => &grad_sq * (1.0 - self.beta2),
                    };

                    let update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;

                    let mut data = param.data_mut();
                    *data = &*data * decay_factor - &update;

                    *m_cell = Some(m_t);
                    *v_cell = Some(v_t);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tensor;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    fn single_group(values: Vec<f32>, lr: f32, weight_decay: f32) -> (Tensor, Vec<ParamGroup>) {
        let param = Tensor::from_vec(values, true);
        let groups = vec![ParamGroup::new(vec![param.clone()], lr, weight_decay)];
        (param, groups)
    }

    #[test]
    fn test_adam_quadratic_convergence() {
        let (param, groups) = single_group(vec![5.0, -3.0, 2.0], 0.1, 0.0);
        let mut opt = Adam::default_params(groups);

        for _ in 0..100 {
            let grad = param.data().mapv(|x| 2.0 * x);
            param.set_grad(grad);
            opt.step();
        }

        for &val in param.data().iter() {
            assert!(val.abs() < 0.5, "value {val} did not converge");
        }
    }

    #[test]
    fn test_adam_zero_grad_weight_decay_only() {
        let (param, groups) = single_group(vec![1.0], 0.1, 0.1);
        let mut opt = Adam::default_params(groups);

        param.set_grad(arr1(&[0.0]));
        opt.step();

        // θ_t = (1 - lr * λ) * θ_{t-1} = 0.99
        assert_abs_diff_eq!(param.data()[0], 0.99, epsilon = 1e-5);
    }

    #[test]
    fn test_adam_step_count() {
        let (param, groups) = single_group(vec![1.0], 0.01, 0.0);
        let mut opt = Adam::default_params(groups);
        assert_eq!(opt.step_count(), 0);

        param.set_grad(arr1(&[1.0]));
        opt.step();
        opt.step();
        assert_eq!(opt.step_count(), 2);
    }

    #[test]
    fn test_adam_update_is_finite_for_extreme_values() {
        let (param, groups) = single_group(vec![1e6, -1e6, 1e-6, -1e-6], 0.001, 0.0);
        let mut opt = Adam::default_params(groups);

        let grad = param.data().mapv(|x| 2.0 * x);
        param.set_grad(grad);
        opt.step();

        for &val in param.data().iter() {
            assert!(val.is_finite());
        }
    }

    #[test]
    fn test_adam_two_groups_use_own_rates() {
        let fast = Tensor::from_vec(vec![1.0], true);
        let slow = Tensor::from_vec(vec![1.0], true);
        let groups = vec![
            ParamGroup::new(vec![fast.clone()], 0.1, 0.0),
            ParamGroup::new(vec![slow.clone()], 0.001, 0.0),
        ];
        let mut opt = Adam::default_params(groups);

        fast.set_grad(arr1(&[1.0]));
        slow.set_grad(arr1(&[1.0]));
        opt.step();

        let fast_delta = (1.0 - fast.data()[0]).abs();
        let slow_delta = (1.0 - slow.data()[0]).abs();
        assert!(fast_delta > slow_delta);
    }
}
