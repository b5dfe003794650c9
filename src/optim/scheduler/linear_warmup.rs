//! Linear warmup scheduler

use super::super::Optimizer;

/// Linear warmup from 0 to a target learning rate over a fixed number
/// of steps, applied to every parameter group. Used for the optional
/// warmup stage that precedes the cosine schedule.
pub struct LinearWarmup {
    target_lr: f32,
    warmup_steps: usize,
    current_step: usize,
}

impl LinearWarmup {
    /// Create a new warmup scheduler
    pub fn new(target_lr: f32, warmup_steps: usize) -> Self {
        Self { target_lr, warmup_steps, current_step: 0 }
    }

    /// Learning rate at the current step
    pub fn get_lr(&self) -> f32 {
        if self.warmup_steps == 0 || self.current_step >= self.warmup_steps {
            return self.target_lr;
        }
        self.target_lr * self.current_step as f32 / self.warmup_steps as f32
    }

    /// Advance one step and write the ramped rate into every group
    pub fn step<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) {
        self.current_step += 1;
        optimizer.set_lr(self.get_lr());
    }

    /// Whether the ramp has reached the target
    pub fn finished(&self) -> bool {
        self.current_step >= self.warmup_steps
    }
}
