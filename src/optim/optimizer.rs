//! Optimizer trait

use super::ParamGroup;

/// Trait for optimization algorithms operating on parameter groups.
///
/// Implementors own their parameter groups; schedulers receive the
/// optimizer by mutable reference and rewrite each group's learning
/// rate and weight decay between updates.
pub trait Optimizer {
    /// Perform a single optimization step using each group's current
    /// learning rate and weight decay
    fn step(&mut self);

    /// The parameter groups, in construction order
    fn param_groups(&self) -> &[ParamGroup];

    /// Mutable access to the parameter groups, in construction order
    fn param_groups_mut(&mut self) -> &mut [ParamGroup];

    /// Zero out all gradients
    fn zero_grad(&mut self) {
        for group in self.param_groups_mut() {
            for param in &group.params {
                param.zero_grad();
            }
        }
    }

    /// Learning rate of the first parameter group
    fn lr(&self) -> f32 {
        self.param_groups().first().map_or(0.0, |g| g.lr)
    }

    /// Set the learning rate of every parameter group
    fn set_lr(&mut self, lr: f32) {
        for group in self.param_groups_mut() {
            group.lr = lr;
        }
    }
}
