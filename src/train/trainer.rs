//! Training and validation loops

use super::checkpoint::Checkpoint;
use super::loss::{build_loss, Loss};
use super::meter::AverageMeter;
use super::metrics::{f_score, search_threshold};
use super::mixup::mixup;
use crate::context::RunContext;
use crate::data::{Batch, StackDataset};
use crate::model::BlendModel;
use crate::optim::{
    build_optimizer, CosineRestarts, LinearWarmup, Optimizer, RestartOptions,
};
use crate::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Instant;

/// Outcome of a full training run
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub best_score: f32,
    pub best_epoch: i64,
    pub best_path: Option<PathBuf>,
}

/// Train for one epoch under the cosine schedule.
///
/// The scheduler is stepped once per mini-batch; the optimizer is
/// stepped once per accumulation window. Returns the average loss.
#[allow(clippy::too_many_arguments)]
pub fn train_epoch(
    ctx: &RunContext,
    batches: &[Batch],
    model: &BlendModel,
    loss_fn: &dyn Loss,
    optimizer: &mut dyn Optimizer,
    epoch: i64,
    scheduler: &mut CosineRestarts,
    rng: &mut StdRng,
) -> Result<f32> {
    let train_cfg = &ctx.spec.train;
    ctx.info(&format!("epoch: {epoch}"));
    ctx.info(&format!("learning rate: {:.8}", optimizer.lr()));

    let mut batch_time = AverageMeter::new();
    let mut losses = AverageMeter::new();
    let mut avg_score = AverageMeter::new();

    let mut num_steps = batches.len();
    if let Some(max_steps) = train_cfg.max_steps_per_epoch {
        num_steps = num_steps.min(max_steps);
    }
    num_steps -= num_steps % train_cfg.accum_batches_num;

    ctx.info(&format!("total batches: {num_steps}"));
    let mut end = Instant::now();

    for (i, batch) in batches.iter().enumerate().take(num_steps) {
        let (inputs, targets) = if train_cfg.mixup.enable {
            mixup(&batch.inputs, &batch.targets, train_cfg.mixup.beta_a, rng)
        } else {
            (batch.inputs.clone(), batch.targets.clone())
        };

        let output = model.forward(&inputs);
        let loss = loss_fn.loss(&output, &targets);

        avg_score.update(f_score(&output, &targets, 0.1, 2.0), 1);
        losses.update(loss, inputs.nrows());

        model.backward(&inputs, &loss_fn.grad(&output, &targets));

        if (i + 1) % train_cfg.accum_batches_num == 0 {
            optimizer.step();
            optimizer.zero_grad();
        }

        scheduler.step(optimizer)?;

        batch_time.update(end.elapsed().as_secs_f32(), 1);
        end = Instant::now();

        if i % train_cfg.log_freq == 0 {
            ctx.info(&format!(
                "{epoch} [{i}/{num_steps}]\ttime {:.3} ({:.3})\tloss {:.4} ({:.4})\tF2 {:.4} ({:.4})\tlr {:.8}",
                batch_time.val,
                batch_time.avg,
                losses.val,
                losses.avg,
                avg_score.val,
                avg_score.avg,
                optimizer.lr()
            ));
        }
    }

    ctx.info(&format!(" * average F2 on train {:.4}", avg_score.avg));
    Ok(losses.avg)
}

/// Run the linear warmup stage: plain optimizer steps with the warmup
/// ramp applied after each one
pub fn warmup_stage(
    ctx: &RunContext,
    batches: &[Batch],
    model: &BlendModel,
    loss_fn: &dyn Loss,
    optimizer: &mut dyn Optimizer,
    warmup: &mut LinearWarmup,
    max_steps: usize,
) -> Result<()> {
    let num_steps = batches.len().min(max_steps);
    ctx.info(&format!("total batches: {num_steps}"));

    for (i, batch) in batches.iter().enumerate().take(num_steps) {
        let output = model.forward(&batch.inputs);
        let loss = loss_fn.loss(&output, &batch.targets);

        model.backward(&batch.inputs, &loss_fn.grad(&output, &batch.targets));
        optimizer.step();
        optimizer.zero_grad();
        warmup.step(optimizer);

        if i % ctx.spec.train.log_freq == 0 {
            ctx.info(&format!(
                "warmup [{i}/{num_steps}]\tloss {loss:.4}\tlr {:.8}",
                optimizer.lr()
            ));
        }
    }

    Ok(())
}

/// Forward the model over a loader without updating anything; returns
/// `(predictions, targets)` stacked in batch order
pub fn inference(batches: &[Batch], model: &BlendModel) -> (Array2<f32>, Array2<f32>) {
    let num_classes = model.num_classes();
    let mut predicts = Vec::new();
    let mut targets = Vec::new();
    let mut rows = 0;

    for batch in batches {
        let output = model.forward(&batch.inputs);
        predicts.extend(output.iter().copied());
        targets.extend(batch.targets.iter().copied());
        rows += batch.size();
    }

    (
        Array2::from_shape_vec((rows, num_classes), predicts)
            .expect("prediction rows are num_classes wide"),
        Array2::from_shape_vec((rows, num_classes), targets)
            .expect("target rows are num_classes wide"),
    )
}

/// Validation: infer, search the calibration threshold, report.
/// Returns `(best_score, best_threshold, predictions)`.
pub fn validate(
    ctx: &RunContext,
    batches: &[Batch],
    model: &BlendModel,
    epoch: i64,
) -> (f32, f32, Array2<f32>) {
    ctx.info("validate()");

    let (predicts, targets) = inference(batches, model);
    if predicts.nrows() == 0 {
        return (0.0, 0.0, predicts);
    }

    let (best_score, best_thresh) = search_threshold(&predicts, &targets, 2.0);

    ctx.info(&format!("{epoch} F2 {best_score:.4} threshold {best_thresh:.4}"));
    ctx.info(&format!(" * F2 on validation {best_score:.4}"));
    (best_score, best_thresh, predicts)
}

/// Full training run for one fold: optional warmup stage, then the
/// cosine-restart schedule with per-epoch validation and best-score
/// checkpointing. On restart the best metric is pulled down to
/// `cosine.min_metric_val` so the new period gets a fresh chance to
/// snapshot.
pub fn fit(
    ctx: &RunContext,
    train_set: &StackDataset,
    val_set: &StackDataset,
    resume: Option<&Checkpoint>,
) -> Result<FitOutcome> {
    let spec = &ctx.spec;
    let batch_size = spec.train.batch_size;
    let num_models = spec.data.inputs.len();

    let mut rng = StdRng::seed_from_u64(spec.train.seed);
    let model = BlendModel::new(spec.model.num_classes, num_models, &mut rng);
    let loss_fn = build_loss(&spec.loss)?;

    let mut last_epoch: i64 = -1;
    if let Some(ckpt) = resume {
        ckpt.restore(&model)?;
        last_epoch = ckpt.epoch;
        ctx.info(&format!("loaded the model from epoch {last_epoch}"));
    }

    let batches_per_epoch = train_set.len() / batch_size;
    if batches_per_epoch == 0 {
        return Err(Error::DataError(format!(
            "{} training samples cannot fill one batch of {batch_size}",
            train_set.len()
        )));
    }

    if resume.is_none() && spec.train.warmup.enable {
        ctx.info(&"-".repeat(50));
        ctx.info(&format!("doing warmup for {} steps", spec.train.warmup.steps));
        ctx.info(&format!("max_lr will be {}", spec.train.warmup.max_lr));

        let mut warm_opt = build_optimizer(
            &spec.optimizer,
            model.param_groups(spec.optimizer.lr, spec.optimizer.weight_decay),
        )?;
        let mut warmup = LinearWarmup::new(spec.train.warmup.max_lr, spec.train.warmup.steps);
        let batches = train_set.batches(batch_size, true, true, &mut rng);
        warmup_stage(
            ctx,
            &batches,
            &model,
            loss_fn.as_ref(),
            warm_opt.as_mut(),
            &mut warmup,
            spec.train.warmup.steps,
        )?;
    }

    // The main stage gets a fresh optimizer starting at the cosine
    // peak rate
    let mut optimizer = build_optimizer(
        &spec.optimizer,
        model.param_groups(spec.cosine.start_lr, spec.optimizer.weight_decay),
    )?;
    if let Some(ckpt) = resume {
        for group in optimizer.param_groups_mut() {
            group.initial_lr = ckpt.initial_lr;
        }
    }

    let steps_per_epoch = spec
        .train
        .max_steps_per_epoch
        .map_or(batches_per_epoch, |max| batches_per_epoch.min(max));
    let epoch_size = steps_per_epoch * batch_size;

    let cosine = &spec.cosine;
    let mut scheduler = CosineRestarts::with_options(
        optimizer.as_mut(),
        batch_size,
        epoch_size,
        RestartOptions {
            restart_period: cosine.period,
            period_inc: cosine.period_inc,
            max_period: cosine.max_period,
            last_epoch: resume.map(|c| c.epoch.max(0) as u64),
            eta_threshold: cosine.eta_threshold,
            min_lr: cosine.min_lr,
            verbose: cosine.verbose,
        },
    )?;

    ctx.info(&format!("training will start from epoch {}", last_epoch + 1));

    let mut best_score = 0.0f32;
    let mut best_epoch = last_epoch;
    let mut best_path: Option<PathBuf> = None;
    let initial_lr = optimizer.param_groups().first().and_then(|g| g.initial_lr);

    for epoch in (last_epoch + 1)..spec.train.num_epochs as i64 {
        ctx.info(&"-".repeat(50));

        let restarted = scheduler.epoch_step(optimizer.as_mut())?;
        if restarted {
            ctx.info("cosine annealing restarted, resetting the best metric");
            best_score = best_score.min(cosine.min_metric_val);
        }

        let batches = train_set.batches(batch_size, true, true, &mut rng);
        train_epoch(
            ctx,
            &batches,
            &model,
            loss_fn.as_ref(),
            optimizer.as_mut(),
            epoch,
            &mut scheduler,
            &mut rng,
        )?;

        let val_batches = val_set.batches(batch_size, false, false, &mut rng);
        let (score, _, _) = validate(ctx, &val_batches, &model, epoch);

        let is_best = score > best_score;
        best_score = best_score.max(score);
        if is_best {
            best_epoch = epoch;
            let ckpt = Checkpoint::from_model(
                &spec.version,
                ctx.fold,
                epoch,
                score,
                &model,
                initial_lr,
            );
            let path = ckpt.save(&spec.experiment_dir)?;
            ctx.info(&format!("a snapshot was saved to {}", path.display()));
            best_path = Some(path);
        }
    }

    ctx.info(&format!("best score: {best_score:.4}"));
    Ok(FitOutcome { best_score, best_epoch, best_path })
}
