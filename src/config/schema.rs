//! YAML schema for experiment configuration
//!
//! Every recognized field is a named struct member with a serde
//! default, so typos fail at load time instead of mid-run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete experiment specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSpec {
    /// Experiment identifier used in artifact filenames
    #[serde(default = "default_version")]
    pub version: String,

    /// Directory receiving checkpoints, traces and logs
    #[serde(default = "default_experiment_dir")]
    pub experiment_dir: PathBuf,

    /// Ensemble model shape
    pub model: ModelConfig,

    /// Level-1 input locations
    pub data: DataConfig,

    /// Training hyperparameters
    #[serde(default)]
    pub train: TrainParams,

    /// Optimizer selection
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Loss selection
    #[serde(default)]
    pub loss: LossConfig,

    /// Cosine warm-restart schedule
    #[serde(default)]
    pub cosine: CosineConfig,
}

fn default_version() -> String {
    "stack".to_string()
}

fn default_experiment_dir() -> PathBuf {
    PathBuf::from("experiments")
}

/// Ensemble model shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of label classes
    pub num_classes: usize,

    /// Number of cross-validation folds the level-1 models were
    /// trained with
    pub num_folds: usize,
}

/// Level-1 input locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the level-1 prediction bundles
    #[serde(default)]
    pub input_dir: PathBuf,

    /// Out-of-fold bundles: one entry per level-1 model, one file per
    /// fold, ordered by fold index
    pub inputs: Vec<Vec<PathBuf>>,

    /// Test-set bundles, one file per level-1 model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_inputs: Option<Vec<PathBuf>>,

    /// JSON array assigning a fold index to every training sample
    pub folds_file: PathBuf,

    /// CSV of sample ids and space-separated label indices
    pub labels_file: PathBuf,

    /// Directory holding the per-model threshold sidecars
    #[serde(default)]
    pub threshold_dir: PathBuf,
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    pub batch_size: usize,
    pub num_epochs: usize,

    /// Cap on optimizer updates per epoch
    pub max_steps_per_epoch: Option<usize>,

    /// Log a progress line every this many steps
    pub log_freq: usize,

    /// Number of mini-batches accumulated per optimizer update
    pub accum_batches_num: usize,

    /// Random seed for shuffling, mixup and weight init
    pub seed: u64,

    pub mixup: MixupConfig,
    pub warmup: WarmupConfig,
    pub lr_finder: LrFinderConfig,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            batch_size: 32,
            num_epochs: 40,
            max_steps_per_epoch: None,
            log_freq: 100,
            accum_batches_num: 1,
            seed: 0,
            mixup: MixupConfig::default(),
            warmup: WarmupConfig::default(),
            lr_finder: LrFinderConfig::default(),
        }
    }
}

/// Mixup augmentation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixupConfig {
    pub enable: bool,

    /// Both shape parameters of the Beta distribution the mixing
    /// coefficient is drawn from
    pub beta_a: f32,
}

impl Default for MixupConfig {
    fn default() -> Self {
        Self { enable: false, beta_a: 0.2 }
    }
}

/// Warmup stage preceding the cosine schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    pub enable: bool,
    pub steps: usize,
    pub max_lr: f32,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self { enable: false, steps: 100, max_lr: 0.01 }
    }
}

/// Learning rate range test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LrFinderConfig {
    pub num_steps: usize,
    pub init_value: f32,
    pub final_value: f32,

    /// Smoothing factor for the running loss
    pub beta: f32,
}

impl Default for LrFinderConfig {
    fn default() -> Self {
        Self { num_steps: 100, init_value: 1e-6, final_value: 1.0, beta: 0.98 }
    }
}

/// Optimizer selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// "sgd" or "adam"
    pub name: String,
    pub lr: f32,
    pub momentum: f32,
    pub weight_decay: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { name: "sgd".to_string(), lr: 0.01, momentum: 0.9, weight_decay: 0.0 }
    }
}

/// Loss selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LossConfig {
    /// "bce" or "mse"
    pub name: String,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self { name: "bce".to_string() }
    }
}

/// Cosine warm-restart schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CosineConfig {
    /// Learning rate at the top of each restart period
    pub start_lr: f32,

    /// Epoch count of the first restart period
    pub period: f32,

    /// Period increment applied at each restart
    pub period_inc: f32,

    /// Maximum period, in epochs
    pub max_period: f32,

    /// Floor for the produced learning rate
    pub min_lr: f32,

    /// Restart count beyond which the eta envelope contracts
    pub eta_threshold: usize,

    /// Log restart events
    pub verbose: bool,

    /// Value the best validation metric is reset to after a restart
    pub min_metric_val: f32,
}

impl Default for CosineConfig {
    fn default() -> Self {
        Self {
            start_lr: 0.01,
            period: 5.0,
            period_inc: 1.0,
            max_period: 50.0,
            min_lr: 1e-7,
            eta_threshold: 1000,
            verbose: false,
            min_metric_val: 0.0,
        }
    }
}
