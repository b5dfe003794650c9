//! Running averages for training statistics

/// Tracks the latest value and the running average of a statistic
#[derive(Debug, Clone, Default)]
pub struct AverageMeter {
    pub val: f32,
    pub avg: f32,
    pub sum: f32,
    pub count: usize,
}

impl AverageMeter {
    /// Create a zeroed meter
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record a value observed over `n` samples
    pub fn update(&mut self, val: f32, n: usize) {
        self.val = val;
        self.sum += val * n as f32;
        self.count += n;
        self.avg = self.sum / self.count as f32;
    }
}
