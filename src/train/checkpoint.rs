//! Checkpoint saving and loading
//!
//! Checkpoints are JSON snapshots of the blend model plus the
//! bookkeeping needed to resume: the epoch, the score that earned the
//! snapshot, and the frozen initial learning rate the scheduler
//! requires back in the parameter groups on resume.

use crate::model::BlendModel;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A saved training snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: String,
    pub fold: usize,
    pub epoch: i64,
    pub score: f32,
    pub num_classes: usize,
    pub num_models: usize,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,

    /// Learning rate frozen by the scheduler at the start of the run
    pub initial_lr: Option<f32>,

    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot a model's parameters
    pub fn from_model(
        version: &str,
        fold: usize,
        epoch: i64,
        score: f32,
        model: &BlendModel,
        initial_lr: Option<f32>,
    ) -> Self {
        Self {
            version: version.to_string(),
            fold,
            epoch,
            score,
            num_classes: model.num_classes(),
            num_models: model.num_models(),
            weight: model.weight_data(),
            bias: model.bias_data(),
            initial_lr,
            saved_at: Utc::now(),
        }
    }

    /// Write back into a model with matching shape
    pub fn restore(&self, model: &BlendModel) -> Result<()> {
        if model.num_classes() != self.num_classes || model.num_models() != self.num_models {
            return Err(Error::DataError(format!(
                "checkpoint is for a {}x{} model, got {}x{}",
                self.num_classes,
                self.num_models,
                model.num_classes(),
                model.num_models()
            )));
        }
        model.set_parameters(&self.weight, &self.bias)
    }

    /// Artifact filename, score-stamped
    pub fn file_name(&self) -> String {
        format!(
            "{}_f{}_e{:02}_{:.4}.json",
            self.version, self.fold, self.epoch, self.score
        )
    }

    /// Save into a directory, creating it when needed; returns the
    /// written path
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        let json = serde_json::to_string(self)
            .map_err(|e| Error::Serialization(format!("checkpoint encoding failed: {e}")))?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Load a checkpoint
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::DataError(format!("failed to read checkpoint {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Serialization(format!("checkpoint {} is malformed: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn model() -> BlendModel {
        let mut rng = StdRng::seed_from_u64(0);
        BlendModel::new(3, 2, &mut rng)
    }

    #[test]
    fn test_checkpoint_file_name_format() {
        let ckpt = Checkpoint::from_model("v1", 2, 7, 0.5912, &model(), Some(0.01));
        assert_eq!(ckpt.file_name(), "v1_f2_e07_0.5912.json");
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let dir = TempDir::new().unwrap();
        let source = model();
        let ckpt = Checkpoint::from_model("v1", 0, 3, 0.42, &source, Some(0.01));

        let path = ckpt.save(dir.path()).unwrap();
        assert!(path.exists());

        let loaded = Checkpoint::load(&path).unwrap();
        assert_eq!(loaded.epoch, 3);
        assert_eq!(loaded.initial_lr, Some(0.01));

        let target = model();
        loaded.restore(&target).unwrap();
        assert_eq!(target.weight_data(), source.weight_data());
        assert_eq!(target.bias_data(), source.bias_data());
    }

    #[test]
    fn test_restore_shape_mismatch_rejected() {
        let ckpt = Checkpoint::from_model("v1", 0, 0, 0.0, &model(), None);

        let mut rng = StdRng::seed_from_u64(1);
        let other = BlendModel::new(4, 2, &mut rng);
        assert!(ckpt.restore(&other).is_err());
    }

    #[test]
    fn test_load_missing_checkpoint() {
        assert!(Checkpoint::load(Path::new("/nonexistent/ckpt.json")).is_err());
    }
}
