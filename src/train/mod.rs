//! Training pipeline
//!
//! Loss functions, F-beta metrics with threshold calibration, mixup,
//! the train/validate loop under the cosine warm-restart schedule,
//! the learning rate range test, checkpointing, and level-1 prediction
//! generation.

mod checkpoint;
mod loss;
mod lr_finder;
mod meter;
mod metrics;
mod mixup;
mod predict;
mod trainer;

pub use checkpoint::Checkpoint;
pub use loss::{build_loss, Bce, Loss, Mse};
pub use lr_finder::{lr_finder, LrRange};
pub use meter::AverageMeter;
pub use metrics::{f_score, search_threshold};
pub use mixup::mixup;
pub use predict::{gen_test_prediction, gen_train_prediction};
pub use trainer::{fit, inference, train_epoch, validate, warmup_stage, FitOutcome};
