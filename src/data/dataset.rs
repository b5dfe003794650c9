//! Stacked dataset and batching

use crate::{Error, Result};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

/// A training batch of stacked features and multi-hot targets
#[derive(Debug, Clone)]
pub struct Batch {
    /// `batch x (num_classes * num_models)` features
    pub inputs: Array2<f32>,
    /// `batch x num_classes` targets
    pub targets: Array2<f32>,
}

impl Batch {
    /// Create a new batch
    pub fn new(inputs: Array2<f32>, targets: Array2<f32>) -> Self {
        Self { inputs, targets }
    }

    /// Number of samples in the batch
    pub fn size(&self) -> usize {
        self.inputs.nrows()
    }
}

/// Stacked level-1 features paired with targets
#[derive(Debug, Clone)]
pub struct StackDataset {
    pub inputs: Array2<f32>,
    pub targets: Array2<f32>,
}

impl StackDataset {
    /// Create a dataset, checking that features and targets agree on
    /// the sample count
    pub fn new(inputs: Array2<f32>, targets: Array2<f32>) -> Result<Self> {
        if inputs.nrows() != targets.nrows() {
            return Err(Error::DataError(format!(
                "{} feature rows but {} target rows",
                inputs.nrows(),
                targets.nrows()
            )));
        }
        Ok(Self { inputs, targets })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    /// Whether the dataset holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize mini-batches.
    ///
    /// Training uses `shuffle = true, drop_last = true` so every batch
    /// is full; validation keeps order and the trailing partial batch.
    pub fn batches<R: Rng>(
        &self,
        batch_size: usize,
        shuffle: bool,
        drop_last: bool,
        rng: &mut R,
    ) -> Vec<Batch> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        if shuffle {
            indices.shuffle(rng);
        }

        indices
            .chunks(batch_size)
            .filter(|chunk| !drop_last || chunk.len() == batch_size)
            .map(|chunk| {
                Batch::new(
                    self.inputs.select(Axis(0), chunk),
                    self.targets.select(Axis(0), chunk),
                )
            })
            .collect()
    }
}

/// Split stacked features and targets into train and validation sets
/// by held-out fold
pub fn train_val_split(
    features: &Array2<f32>,
    targets: &Array2<f32>,
    folds: &[u32],
    fold: usize,
) -> Result<(StackDataset, StackDataset)> {
    if folds.len() != features.nrows() {
        return Err(Error::DataError(format!(
            "fold map has {} entries for {} samples",
            folds.len(),
            features.nrows()
        )));
    }

    let (mut train_idx, mut val_idx) = (Vec::new(), Vec::new());
    for (i, &f) in folds.iter().enumerate() {
        if f as usize == fold {
            val_idx.push(i);
        } else {
            train_idx.push(i);
        }
    }

    let train = StackDataset::new(
        features.select(Axis(0), &train_idx),
        targets.select(Axis(0), &train_idx),
    )?;
    let val = StackDataset::new(
        features.select(Axis(0), &val_idx),
        targets.select(Axis(0), &val_idx),
    )?;
    Ok((train, val))
}
