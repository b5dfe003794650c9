//! Level-1 prediction loading and stacked dataset assembly

mod dataset;
mod labels;
mod level1;

pub use dataset::{train_val_split, Batch, StackDataset};
pub use labels::{load_folds, load_labels};
pub use level1::{
    load_oof_features, load_test_features, load_threshold, save_threshold, threshold_path,
    PredictionFile,
};

use crate::context::RunContext;
use crate::Result;

/// Load everything one fold's training run needs: stacked out-of-fold
/// features split into train and validation sets
pub fn load_data(ctx: &RunContext) -> Result<(StackDataset, StackDataset)> {
    let spec = &ctx.spec;

    ctx.info("loading data");
    let folds = load_folds(&spec.data.folds_file)?;
    let targets = load_labels(&spec.data.labels_file, spec.model.num_classes)?;

    let features = load_oof_features(
        &spec.data.inputs,
        &spec.data.input_dir,
        &spec.data.threshold_dir,
        &folds,
        spec.model.num_classes,
    )?;

    let (train, val) = train_val_split(&features, &targets, &folds, ctx.fold)?;
    ctx.debug(&format!(
        "train samples: {}, val samples: {}, features: {}",
        train.len(),
        val.len(),
        train.inputs.ncols()
    ));

    Ok((train, val))
}
