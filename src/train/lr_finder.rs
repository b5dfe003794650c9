//! Learning rate range test
//!
//! Ramps the learning rate geometrically over a short run, tracks the
//! smoothed loss, and picks a usable range from the curve: the
//! steepest-descent point as the low end and the loss minimum (divided
//! by 4) as the high end.

use super::loss::Loss;
use crate::context::RunContext;
use crate::data::Batch;
use crate::model::BlendModel;
use crate::optim::Optimizer;
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// The minimum-loss rate overshoots; its quarter is a usable peak
const HIGH_LR_DIVISOR: f32 = 4.0;

#[derive(Debug, Serialize)]
struct LrFinderTrace {
    /// log10 of the learning rate at each step
    logs: Vec<f32>,
    /// Smoothed loss at each step
    losses: Vec<f32>,
}

/// Learning rate range picked by the finder
#[derive(Debug, Clone)]
pub struct LrRange {
    pub best_low_lr: f32,
    pub best_high_lr: f32,
    pub highest_lr: f32,

    /// Where the JSON trace was written
    pub trace_path: PathBuf,
}

/// Run the range test and write the `{logs, losses}` trace next to the
/// experiment's other artifacts
pub fn lr_finder(
    ctx: &RunContext,
    batches: &[Batch],
    model: &BlendModel,
    loss_fn: &dyn Loss,
    optimizer: &mut dyn Optimizer,
) -> Result<LrRange> {
    ctx.info("lr_finder called");

    let cfg = &ctx.spec.train.lr_finder;
    let num_steps = batches.len().min(cfg.num_steps);
    if num_steps < 2 {
        return Err(Error::DataError(format!(
            "lr finder needs at least 2 batches, got {num_steps}"
        )));
    }
    ctx.info(&format!("total batches: {num_steps}"));

    let mult = (cfg.final_value / cfg.init_value).powf(1.0 / (num_steps - 1) as f32);
    let mut lr = cfg.init_value;

    let mut avg_loss = 0.0f32;
    let mut best_loss = 0.0f32;
    let mut losses = Vec::with_capacity(num_steps);
    let mut logs = Vec::with_capacity(num_steps);

    for (i, batch) in batches.iter().enumerate().take(num_steps) {
        optimizer.set_lr(lr);

        let output = model.forward(&batch.inputs);
        let loss_val = loss_fn.loss(&output, &batch.targets);

        model.backward(&batch.inputs, &loss_fn.grad(&output, &batch.targets));
        optimizer.step();
        optimizer.zero_grad();

        avg_loss = cfg.beta * avg_loss + (1.0 - cfg.beta) * loss_val;
        let smoothed_loss = avg_loss / (1.0 - cfg.beta.powi(i as i32 + 1));

        // Stop once the loss explodes
        if i > 0 && smoothed_loss > 4.0 * best_loss {
            break;
        }
        if smoothed_loss < best_loss || i == 0 {
            best_loss = smoothed_loss;
        }

        losses.push(smoothed_loss);
        logs.push(lr.log10());

        lr *= mult;

        if i % ctx.spec.train.log_freq == 0 {
            ctx.info(&format!(
                "lr_finder [{i}/{num_steps}]\tloss {loss_val:.4} ({smoothed_loss:.4})\tlr {lr:.08}"
            ));
        }
    }

    // Steepest descent marks the low end, the minimum marks the high
    let first = (1..losses.len())
        .min_by(|&a, &b| {
            let da = losses[a] - losses[a - 1];
            let db = losses[b] - losses[b - 1];
            da.total_cmp(&db)
        })
        .unwrap_or(0);
    let last = (0..losses.len())
        .min_by(|&a, &b| losses[a].total_cmp(&losses[b]))
        .unwrap_or(0);

    let highest_lr = 10f32.powf(logs[last]);
    let best_high_lr = highest_lr / HIGH_LR_DIVISOR;
    let best_low_lr = 10f32.powf(logs[first]);
    ctx.info(&format!(
        "best_low_lr={best_low_lr} best_high_lr={best_high_lr} highest_lr={highest_lr}"
    ));

    fs::create_dir_all(&ctx.spec.experiment_dir)?;
    let trace_path = ctx
        .spec
        .experiment_dir
        .join(format!("lr_finder_{}.json", ctx.spec.version));
    let trace = LrFinderTrace { logs, losses };
    let json = serde_json::to_string(&trace)
        .map_err(|e| Error::Serialization(format!("lr finder trace encoding failed: {e}")))?;
    fs::write(&trace_path, json)?;

    Ok(LrRange { best_low_lr, best_high_lr, highest_lr, trace_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, ModelConfig, StackSpec};
    use crate::context::LogLevel;
    use crate::optim::build_optimizer;
    use crate::train::loss::build_loss;
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn ctx_with_dir(dir: PathBuf) -> RunContext {
        let spec = StackSpec {
            version: "lrf".to_string(),
            experiment_dir: dir,
            model: ModelConfig { num_classes: 2, num_folds: 2 },
            data: DataConfig {
                input_dir: PathBuf::new(),
                inputs: vec![vec![PathBuf::from("a0"), PathBuf::from("a1")]],
                test_inputs: None,
                folds_file: PathBuf::from("folds.json"),
                labels_file: PathBuf::from("train.csv"),
                threshold_dir: PathBuf::new(),
            },
            train: Default::default(),
            optimizer: Default::default(),
            loss: Default::default(),
            cosine: Default::default(),
        };
        RunContext::new(spec, 0, LogLevel::Quiet)
    }

    #[test]
    fn test_lr_finder_writes_trace_and_orders_range() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_with_dir(dir.path().to_path_buf());

        let mut rng = StdRng::seed_from_u64(0);
        let model = BlendModel::new(2, 1, &mut rng);
        let loss_fn = build_loss(&ctx.spec.loss).unwrap();
        let mut optimizer =
            build_optimizer(&ctx.spec.optimizer, model.param_groups(0.01, 0.0)).unwrap();

        let batches: Vec<Batch> = (0..20)
            .map(|_| Batch::new(arr2(&[[0.9, 0.1], [0.1, 0.9]]), arr2(&[[1.0, 0.0], [0.0, 1.0]])))
            .collect();

        let range =
            lr_finder(&ctx, &batches, &model, loss_fn.as_ref(), optimizer.as_mut()).unwrap();

        assert!(range.trace_path.exists());
        assert!(range.best_high_lr <= range.highest_lr);
        assert!(range.best_low_lr > 0.0);

        let content = std::fs::read_to_string(&range.trace_path).unwrap();
        assert!(content.contains("logs"));
        assert!(content.contains("losses"));
    }

    #[test]
    fn test_lr_finder_rejects_tiny_loader() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_with_dir(dir.path().to_path_buf());

        let mut rng = StdRng::seed_from_u64(0);
        let model = BlendModel::new(2, 1, &mut rng);
        let loss_fn = build_loss(&ctx.spec.loss).unwrap();
        let mut optimizer =
            build_optimizer(&ctx.spec.optimizer, model.param_groups(0.01, 0.0)).unwrap();

        let batches = vec![Batch::new(arr2(&[[0.5, 0.5]]), arr2(&[[1.0, 0.0]]))];
        assert!(lr_finder(&ctx, &batches, &model, loss_fn.as_ref(), optimizer.as_mut()).is_err());
    }
}
