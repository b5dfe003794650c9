//! Parameter groups
//!
//! A parameter group is the unit the optimizer and the learning-rate
//! schedulers operate on: a set of parameters sharing one learning rate
//! and one weight decay value. The scheduler overwrites `lr` and
//! `weight_decay` in place; `initial_lr` is frozen once at scheduler
//! construction and read back when resuming a run.

use crate::Tensor;

/// A group of parameters sharing learning rate and weight decay.
#[derive(Debug, Clone)]
pub struct ParamGroup {
    /// Parameters updated with this group's rates
    pub params: Vec<Tensor>,

    /// Current learning rate, overwritten by the scheduler every step
    pub lr: f32,

    /// Current weight decay, overwritten by the scheduler every step
    pub weight_decay: f32,

    /// Learning rate frozen at scheduler construction; required to be
    /// present when resuming
    pub initial_lr: Option<f32>,
}

impl ParamGroup {
    /// Create a new group; `initial_lr` stays unset until a scheduler
    /// freezes it
    pub fn new(params: Vec<Tensor>, lr: f32, weight_decay: f32) -> Self {
        Self { params, lr, weight_decay, initial_lr: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group_has_no_initial_lr() {
        let group = ParamGroup::new(vec![Tensor::zeros(2, true)], 0.1, 0.01);
        assert_eq!(group.lr, 0.1);
        assert_eq!(group.weight_decay, 0.01);
        assert!(group.initial_lr.is_none());
    }
}
