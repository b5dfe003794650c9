//! Level-1 prediction generation
//!
//! After training, the model's own predictions become level-1 inputs
//! for the next stacking round: out-of-fold predictions are calibrated
//! by threshold search, recentered by subtracting the threshold, and
//! written as a bundle with the threshold in a YAML sidecar.

use super::trainer::{inference, validate};
use crate::context::RunContext;
use crate::data::{load_threshold, save_threshold, Batch, PredictionFile};
use crate::model::BlendModel;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

fn model_stem(model_path: &Path) -> Result<String> {
    model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::DataError(format!("bad model path {}", model_path.display())))
}

/// Generate the out-of-fold prediction bundle for the held-out fold.
///
/// Returns the bundle path; the threshold sidecar lands next to it.
pub fn gen_train_prediction(
    ctx: &RunContext,
    val_batches: &[Batch],
    model: &BlendModel,
    epoch: i64,
    model_path: &Path,
) -> Result<PathBuf> {
    let (_, threshold, predicts) = validate(ctx, val_batches, model, epoch);
    let predicts = predicts - threshold;

    let stem = model_stem(model_path)?;
    let out_dir = &ctx.spec.experiment_dir;
    fs::create_dir_all(out_dir)?;

    let bundle_path = out_dir.join(format!("level1_train_{stem}.json"));
    PredictionFile::from_matrix(stem.clone(), Some(ctx.fold), &predicts).save(&bundle_path)?;
    save_threshold(&out_dir.join(format!("{stem}.yml")), threshold)?;

    Ok(bundle_path)
}

/// Generate the test-set prediction bundle, recentered by the
/// threshold found on the out-of-fold run
pub fn gen_test_prediction(
    ctx: &RunContext,
    test_batches: &[Batch],
    model: &BlendModel,
    model_path: &Path,
) -> Result<PathBuf> {
    let stem = model_stem(model_path)?;
    let threshold =
        load_threshold(&ctx.spec.data.threshold_dir.join(format!("{stem}.yml")))?;

    let (predicts, _) = inference(test_batches, model);
    let predicts = predicts - threshold;

    let out_dir = &ctx.spec.experiment_dir;
    fs::create_dir_all(out_dir)?;

    let bundle_path = out_dir.join(format!("level1_test_{stem}.json"));
    PredictionFile::from_matrix(stem, None, &predicts).save(&bundle_path)?;

    Ok(bundle_path)
}
