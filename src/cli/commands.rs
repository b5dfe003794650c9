//! Command handlers

use super::{Cli, Command, ConfigArgs, LrFinderArgs, PredictArgs, TrainArgs};
use crate::config::{load_config, StackSpec};
use crate::context::{LogLevel, RunContext};
use crate::data::{load_data, load_test_features, StackDataset};
use crate::model::BlendModel;
use crate::optim::build_optimizer;
use crate::train::{
    build_loss, fit, gen_test_prediction, gen_train_prediction, lr_finder, Checkpoint,
};
use crate::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn log_level(cli: &Cli) -> LogLevel {
    if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    }
}

/// Dispatch a parsed CLI invocation
pub fn run_command(cli: Cli) -> Result<()> {
    let level = log_level(&cli);
    match cli.command.clone() {
        Command::Train(args) => run_train(&args, level),
        Command::Validate(args) => run_validate(&args),
        Command::Info(args) => run_info(&args),
        Command::LrFinder(args) => run_lr_finder(&args, level),
        Command::PredictOof(args) => run_predict_oof(&args, level),
        Command::PredictTest(args) => run_predict_test(&args, level),
    }
}

fn apply_overrides(spec: &mut StackSpec, args: &TrainArgs) {
    if let Some(num_epochs) = args.num_epochs {
        spec.train.num_epochs = num_epochs;
    }
    if let Some(lr) = args.lr {
        spec.cosine.start_lr = lr;
    }
}

fn run_train(args: &TrainArgs, level: LogLevel) -> Result<()> {
    let mut spec = load_config(&args.config)?;
    apply_overrides(&mut spec, args);

    let ctx = RunContext::new(spec, args.fold, level);
    let (train_set, val_set) = load_data(&ctx)?;

    let resume = args.weights.as_deref().map(Checkpoint::load).transpose()?;
    if let (Some(ckpt), Some(weights)) = (&resume, &args.weights) {
        ctx.info(&format!("checkpoint loaded: {}", weights.display()));
        if ckpt.fold != args.fold {
            return Err(Error::ConfigError(format!(
                "checkpoint was trained on fold {}, requested fold {}",
                ckpt.fold, args.fold
            )));
        }
    }

    let outcome = fit(&ctx, &train_set, &val_set, resume.as_ref())?;
    ctx.info(&format!(
        "finished: best F2 {:.4} at epoch {}",
        outcome.best_score, outcome.best_epoch
    ));
    Ok(())
}

fn run_validate(args: &ConfigArgs) -> Result<()> {
    let spec = load_config(&args.config)?;
    println!("✓ config is valid");
    println!("  version: {}", spec.version);
    println!("  level-1 models: {}", spec.data.inputs.len());
    println!("  folds: {}", spec.model.num_folds);
    Ok(())
}

fn run_info(args: &ConfigArgs) -> Result<()> {
    let spec = load_config(&args.config)?;
    println!("version: {}", spec.version);
    println!("experiment_dir: {}", spec.experiment_dir.display());
    println!("classes: {}", spec.model.num_classes);
    println!("level-1 models: {}", spec.data.inputs.len());
    println!("optimizer: {} (lr={})", spec.optimizer.name, spec.optimizer.lr);
    println!("loss: {}", spec.loss.name);
    println!(
        "cosine: start_lr={} period={} period_inc={} max_period={}",
        spec.cosine.start_lr, spec.cosine.period, spec.cosine.period_inc, spec.cosine.max_period
    );
    println!("epochs: {}", spec.train.num_epochs);
    println!("batch size: {}", spec.train.batch_size);
    Ok(())
}

fn run_lr_finder(args: &LrFinderArgs, level: LogLevel) -> Result<()> {
    let spec = load_config(&args.config)?;
    let ctx = RunContext::new(spec, args.fold, level);
    let (train_set, _) = load_data(&ctx)?;

    let mut rng = StdRng::seed_from_u64(ctx.spec.train.seed);
    let model = BlendModel::new(ctx.spec.model.num_classes, ctx.spec.data.inputs.len(), &mut rng);
    let loss_fn = build_loss(&ctx.spec.loss)?;
    let mut optimizer = build_optimizer(
        &ctx.spec.optimizer,
        model.param_groups(ctx.spec.optimizer.lr, ctx.spec.optimizer.weight_decay),
    )?;

    let batches = train_set.batches(ctx.spec.train.batch_size, true, true, &mut rng);
    let range = lr_finder(&ctx, &batches, &model, loss_fn.as_ref(), optimizer.as_mut())?;

    println!(
        "suggested range: [{:.2e}, {:.2e}], trace at {}",
        range.best_low_lr,
        range.best_high_lr,
        range.trace_path.display()
    );
    Ok(())
}

/// Rebuild the trained model a predict command needs
fn restore_model(ctx: &RunContext, ckpt: &Checkpoint) -> Result<BlendModel> {
    let mut rng = StdRng::seed_from_u64(ctx.spec.train.seed);
    let model =
        BlendModel::new(ctx.spec.model.num_classes, ctx.spec.data.inputs.len(), &mut rng);
    ckpt.restore(&model)?;
    Ok(model)
}

fn run_predict_oof(args: &PredictArgs, level: LogLevel) -> Result<()> {
    let spec = load_config(&args.config)?;
    let ctx = RunContext::new(spec, args.fold, level);
    let (_, val_set) = load_data(&ctx)?;

    let ckpt = Checkpoint::load(&args.weights)?;
    let model = restore_model(&ctx, &ckpt)?;

    let mut rng = StdRng::seed_from_u64(ctx.spec.train.seed);
    let batches = val_set.batches(ctx.spec.train.batch_size, false, false, &mut rng);
    let path = gen_train_prediction(&ctx, &batches, &model, ckpt.epoch, &args.weights)?;
    ctx.info(&format!("wrote {}", path.display()));
    Ok(())
}

fn run_predict_test(args: &PredictArgs, level: LogLevel) -> Result<()> {
    let spec = load_config(&args.config)?;
    let ctx = RunContext::new(spec, args.fold, level);

    let test_inputs = ctx.spec.data.test_inputs.clone().ok_or_else(|| {
        Error::ConfigError("data.test_inputs must be set for predict-test".to_string())
    })?;
    let features = load_test_features(
        &test_inputs,
        &ctx.spec.data.input_dir,
        &ctx.spec.data.threshold_dir,
        ctx.spec.model.num_classes,
    )?;

    let ckpt = Checkpoint::load(&args.weights)?;
    let model = restore_model(&ctx, &ckpt)?;

    // Targets are unknown for the test set; batching only needs shape
    let placeholder = Array2::zeros((features.nrows(), ctx.spec.model.num_classes));
    let test_set = StackDataset::new(features, placeholder)?;

    let mut rng = StdRng::seed_from_u64(ctx.spec.train.seed);
    let batches = test_set.batches(ctx.spec.train.batch_size, false, false, &mut rng);
    let path = gen_test_prediction(&ctx, &batches, &model, &args.weights)?;
    ctx.info(&format!("wrote {}", path.display()));
    Ok(())
}
