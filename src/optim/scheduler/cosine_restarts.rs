//! Cosine annealing with warm restarts
//!
//! Decays learning rate along a half-cosine, rescales weight decay with
//! the batch/epoch-size normalization of the decoupled weight decay
//! formulation (<https://arxiv.org/abs/1711.05101>), and restarts the
//! annealing phase with progressively longer periods.

use super::super::Optimizer;
use crate::{Error, Result};
use std::f32::consts::PI;

/// Construction options for [`CosineRestarts`].
#[derive(Debug, Clone)]
pub struct RestartOptions {
    /// Epoch count of the first restart period
    pub restart_period: f32,
    /// Period increment applied at each restart
    pub period_inc: f32,
    /// Maximum period value, in epochs
    pub max_period: f32,
    /// Epoch to resume from; `None` starts fresh and freezes each
    /// group's current learning rate as its `initial_lr`
    pub last_epoch: Option<u64>,
    /// Restart count beyond which the eta envelope starts contracting
    pub eta_threshold: usize,
    /// Floor applied to every produced learning rate
    pub min_lr: f32,
    /// Log restart events
    pub verbose: bool,
}

impl Default for RestartOptions {
    fn default() -> Self {
        Self {
            restart_period: 100.0,
            period_inc: 2.0,
            max_period: 100.0,
            last_epoch: None,
            eta_threshold: 1000,
            min_lr: 1e-7,
            verbose: false,
        }
    }
}

/// Fractional positions within one epoch, evenly spaced over `[0, 1]`
/// inclusive. Regenerated by `epoch_step()` and consumed one value per
/// `step()`; consuming past the end is a caller protocol violation.
///
/// When the epoch size does not divide evenly by the batch size the
/// sequence carries one slot for the partial final batch plus the
/// closing `1.0`, which may be consumed one update later than the data
/// actually runs out. Kept for schedule compatibility.
#[derive(Debug, Clone)]
struct BatchIncrement {
    len: usize,
    next: usize,
}

impl BatchIncrement {
    fn exhausted() -> Self {
        Self { len: 0, next: 0 }
    }

    fn new(epoch_size: usize, batch_size: usize) -> Self {
        let whole = epoch_size / batch_size;
        let remainder = epoch_size % batch_size;
        let len = if remainder > 0 { whole + 2 } else { whole + 1 };
        Self { len, next: 0 }
    }
}

impl Iterator for BatchIncrement {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.next >= self.len {
            return None;
        }
        let i = self.next;
        self.next += 1;
        if self.len == 1 {
            Some(0.0)
        } else {
            Some(i as f32 / (self.len - 1) as f32)
        }
    }
}

/// Cosine annealing scheduler with warm restarts and joint weight
/// decay normalization.
///
/// Drives both the learning rate and the weight decay of every
/// parameter group from a single cosine phase. Call [`epoch_step`]
/// once at the top of every training epoch and [`step`] once per
/// optimizer update within the epoch, in strict alternation:
///
/// ```no_run
/// # use apilar::optim::{CosineRestarts, Optimizer, ParamGroup, Sgd};
/// # let mut optimizer = Sgd::new(vec![ParamGroup::new(vec![], 0.1, 0.01)], 0.9);
/// let mut scheduler = CosineRestarts::new(&mut optimizer, 32, 1024, 5.0, 1.0, 10.0)?;
/// for _epoch in 0..100 {
///     let restarted = scheduler.epoch_step(&mut optimizer)?;
///     for _batch in 0..3 {
///         // forward, backward
///         optimizer.step();
///         scheduler.step(&mut optimizer)?;
///     }
/// }
/// # Ok::<(), apilar::Error>(())
/// ```
///
/// [`epoch_step`]: CosineRestarts::epoch_step
/// [`step`]: CosineRestarts::step
#[derive(Debug)]
pub struct CosineRestarts {
    base_lrs: Vec<f32>,
    base_weight_decays: Vec<f32>,
    batch_size: usize,
    epoch_size: usize,
    eta_threshold: usize,
    period_inc: f32,
    max_period: f32,
    restart_period: f32,
    restarts: usize,
    t_epoch: f32,
    last_epoch: i64,
    min_lr: f32,
    verbose: bool,
    batch_increment: BatchIncrement,
}

impl CosineRestarts {
    /// Create a scheduler with default envelope options (fresh start,
    /// `eta_threshold = 1000`, `min_lr = 1e-7`, quiet).
    ///
    /// `epoch_size` is the number of training samples per epoch.
    pub fn new<O: Optimizer + ?Sized>(
        optimizer: &mut O,
        batch_size: usize,
        epoch_size: usize,
        restart_period: f32,
        period_inc: f32,
        max_period: f32,
    ) -> Result<Self> {
        Self::with_options(
            optimizer,
            batch_size,
            epoch_size,
            RestartOptions { restart_period, period_inc, max_period, ..RestartOptions::default() },
        )
    }

    /// Create a scheduler with explicit options.
    ///
    /// On a fresh start every parameter group's current learning rate
    /// is frozen into its `initial_lr`. When resuming
    /// (`last_epoch = Some(..)`) every group must already carry
    /// `initial_lr`; a missing one is an [`Error::InitError`].
    pub fn with_options<O: Optimizer + ?Sized>(
        optimizer: &mut O,
        batch_size: usize,
        epoch_size: usize,
        opts: RestartOptions,
    ) -> Result<Self> {
        let groups = optimizer.param_groups_mut();

        let mut base_lrs = Vec::with_capacity(groups.len());
        for (i, group) in groups.iter_mut().enumerate() {
            match (opts.last_epoch, group.initial_lr) {
                (_, Some(initial)) => base_lrs.push(initial),
                (None, None) => {
                    group.initial_lr = Some(group.lr);
                    base_lrs.push(group.lr);
                }
                (Some(_), None) => {
                    return Err(Error::InitError(format!(
                        "initial_lr is not set in param group {i} when resuming"
                    )));
                }
            }
        }
        let base_weight_decays = groups.iter().map(|g| g.weight_decay).collect();

        Ok(Self {
            base_lrs,
            base_weight_decays,
            batch_size,
            epoch_size,
            eta_threshold: opts.eta_threshold,
            period_inc: opts.period_inc,
            max_period: opts.max_period,
            restart_period: opts.restart_period,
            restarts: 0,
            t_epoch: -1.0,
            last_epoch: opts.last_epoch.map_or(-1, |e| e as i64),
            min_lr: opts.min_lr,
            verbose: opts.verbose,
            batch_increment: BatchIncrement::exhausted(),
        })
    }

    /// Cosine envelope bounds derived from the restart counter.
    ///
    /// Past `eta_threshold` restarts both bounds contract linearly
    /// toward the center at 0.09 per excess restart. Nothing stops the
    /// bounds from crossing far past the threshold; that inversion is
    /// kept as-is (see the fragility tests below).
    fn schedule_eta(&self) -> (f32, f32) {
        let eta_min = 0.0;
        let eta_max = 1.0;
        if self.restarts <= self.eta_threshold {
            (eta_min, eta_max)
        } else {
            let k = (self.restarts - self.eta_threshold) as f32 * 0.09;
            (eta_min + k, eta_max - k)
        }
    }

    /// Learning rate and weight decay for every parameter group at the
    /// fractional epoch position `t_cur`, in group order.
    ///
    /// The weight decay carries the normalization
    /// `sqrt(batch_size / (epoch_size * restart_period))`, keeping the
    /// effective decay invariant to batch size and period length.
    pub fn get_lr(&self, t_cur: f32) -> Vec<(f32, f32)> {
        let (eta_min, eta_max) = self.schedule_eta();

        let eta_t = eta_min
            + 0.5 * (eta_max - eta_min) * (1.0 + (PI * t_cur / self.restart_period).cos());

        let weight_decay_norm =
            (self.batch_size as f32 / (self.epoch_size as f32 * self.restart_period)).sqrt();

        self.base_lrs
            .iter()
            .zip(self.base_weight_decays.iter())
            .map(|(&base_lr, &base_wd)| (base_lr * eta_t, base_wd * eta_t * weight_decay_norm))
            .collect()
    }

    /// Advance to a new epoch and apply the first step of its schedule.
    ///
    /// Returns `true` when this epoch begins a new annealing period.
    /// Must be called once at the top of every training epoch, before
    /// any mini-batch.
    pub fn epoch_step<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> Result<bool> {
        self.last_epoch += 1;
        self.t_epoch += 1.0;
        self.batch_increment = BatchIncrement::new(self.epoch_size, self.batch_size);
        self.step(optimizer)
    }

    /// Apply the schedule for the next mini-batch position and detect
    /// period wrap-around.
    ///
    /// Writes the learning rate (floored at `min_lr`) and weight decay
    /// (unfloored) into every parameter group, then checks whether the
    /// cosine phase has completed a full period. Returns `true` on
    /// restart. Call once per optimizer update; calling more often
    /// than there are mini-batches in the epoch is an
    /// [`Error::BatchIncrementExhausted`].
    pub fn step<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> Result<bool> {
        let increment = self.batch_increment.next().ok_or(Error::BatchIncrementExhausted)?;
        let t_cur = self.t_epoch + increment;

        let min_lr = self.min_lr;
        for (group, (lr, weight_decay)) in
            optimizer.param_groups_mut().iter_mut().zip(self.get_lr(t_cur))
        {
            group.lr = lr.max(min_lr);
            group.weight_decay = weight_decay;
        }

        // The modulo wraps exactly when the phase has run past the
        // period without t_epoch having been reset.
        let mut restarted = false;
        if self.t_epoch % self.restart_period < self.t_epoch {
            restarted = true;
            if self.verbose {
                println!("restart at epoch {}", self.last_epoch);
            }

            self.restart_period = (self.restart_period + self.period_inc).min(self.max_period);
            self.restarts += 1;
            self.t_epoch = 0.0;
        }

        Ok(restarted)
    }

    /// Number of restarts that have occurred
    #[must_use]
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Current restart period, in epochs
    #[must_use]
    pub fn restart_period(&self) -> f32 {
        self.restart_period
    }

    /// Global epoch counter (-1 before the first `epoch_step`)
    #[must_use]
    pub fn last_epoch(&self) -> i64 {
        self.last_epoch
    }
}
