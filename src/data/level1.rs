//! Level-1 prediction bundles
//!
//! A bundle holds one level-1 model's predictions for one fold of the
//! training set (or for the whole test set), flattened row-major, plus
//! shape metadata. Predictions are stored threshold-subtracted by the
//! level-1 stage; loading re-adds the threshold from the model's YAML
//! sidecar so the stacked features land back in `[0, 1]`.

use crate::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Serialized predictions of one level-1 model for one data slice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionFile {
    /// Level-1 model identifier
    pub model: String,

    /// Fold the rows belong to; absent for test-set bundles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fold: Option<usize>,

    pub num_samples: usize,
    pub num_classes: usize,

    /// Row-major `num_samples x num_classes` values
    pub data: Vec<f32>,
}

impl PredictionFile {
    /// Create a bundle from a prediction matrix
    pub fn from_matrix(model: impl Into<String>, fold: Option<usize>, matrix: &Array2<f32>) -> Self {
        Self {
            model: model.into(),
            fold,
            num_samples: matrix.nrows(),
            num_classes: matrix.ncols(),
            data: matrix.iter().copied().collect(),
        }
    }

    /// Reassemble the prediction matrix, checking the declared shape
    pub fn matrix(&self) -> Result<Array2<f32>> {
        if self.data.len() != self.num_samples * self.num_classes {
            return Err(Error::DataError(format!(
                "bundle '{}' declares {}x{} but holds {} values",
                self.model,
                self.num_samples,
                self.num_classes,
                self.data.len()
            )));
        }
        Array2::from_shape_vec((self.num_samples, self.num_classes), self.data.clone())
            .map_err(|e| Error::DataError(format!("bundle '{}': {e}", self.model)))
    }

    /// Write the bundle as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| Error::Serialization(format!("bundle encoding failed: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a bundle from JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::DataError(format!("failed to read bundle {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("bundle {} is malformed: {e}", path.display())))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ThresholdFile {
    threshold: f32,
}

/// Write a per-model threshold sidecar (YAML)
pub fn save_threshold(path: &Path, threshold: f32) -> Result<()> {
    let yaml = serde_yaml::to_string(&ThresholdFile { threshold })
        .map_err(|e| Error::Serialization(format!("threshold encoding failed: {e}")))?;
    fs::write(path, yaml)?;
    Ok(())
}

/// Read a per-model threshold sidecar (YAML)
pub fn load_threshold(path: &Path) -> Result<f32> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::DataError(format!("failed to read threshold {}: {e}", path.display()))
    })?;
    let file: ThresholdFile = serde_yaml::from_str(&content).map_err(|e| {
        Error::Serialization(format!("threshold {} is malformed: {e}", path.display()))
    })?;
    Ok(file.threshold)
}

/// Locate the threshold sidecar for a bundle file.
///
/// Bundles are named `level1_train_<model>...` or
/// `level1_test_<model>...`; the sidecar is `<rest>.yml` in the
/// threshold directory.
pub fn threshold_path(bundle: &Path, threshold_dir: &Path) -> Result<PathBuf> {
    let stem = bundle
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::DataError(format!("bad bundle path {}", bundle.display())))?;

    let name = stem
        .strip_prefix("level1_train_")
        .or_else(|| stem.strip_prefix("level1_test_"))
        .ok_or_else(|| {
            Error::DataError(format!(
                "bundle '{stem}' must be named level1_train_* or level1_test_*"
            ))
        })?;

    Ok(threshold_dir.join(format!("{name}.yml")))
}

/// Load a recentered prediction matrix from a bundle plus its sidecar,
/// warning when the recentered values leave `[0, 1]`
fn load_recentered(bundle_path: &Path, threshold_dir: &Path) -> Result<(PredictionFile, Array2<f32>)> {
    let bundle = PredictionFile::load(bundle_path)?;
    let threshold = load_threshold(&threshold_path(bundle_path, threshold_dir)?)?;

    let mut matrix = bundle.matrix()?;
    matrix += threshold;

    let lo = matrix.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = matrix.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if lo < 0.0 || hi > 1.0 {
        eprintln!(
            "warning: invalid range of data in {}: [{lo:.4}, {hi:.4}]",
            bundle_path.display()
        );
    }

    Ok((bundle, matrix))
}

/// Assemble the stacked out-of-fold feature matrix.
///
/// Output shape is `num_samples x (num_classes * num_models)` with
/// class-major layout: feature `c * num_models + m` is model `m`'s
/// prediction for class `c`.
pub fn load_oof_features(
    inputs: &[Vec<PathBuf>],
    input_dir: &Path,
    threshold_dir: &Path,
    folds: &[u32],
    num_classes: usize,
) -> Result<Array2<f32>> {
    let num_samples = folds.len();
    let num_models = inputs.len();
    let mut features = Array2::zeros((num_samples, num_classes * num_models));

    for (m, files) in inputs.iter().enumerate() {
        for (fold, file) in files.iter().enumerate() {
            let path = input_dir.join(file);
            let (bundle, matrix) = load_recentered(&path, threshold_dir)?;

            if matrix.ncols() != num_classes {
                return Err(Error::DataError(format!(
                    "bundle '{}' has {} classes, expected {num_classes}",
                    bundle.model,
                    matrix.ncols()
                )));
            }

            let rows: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|&(_, &f)| f as usize == fold)
                .map(|(i, _)| i)
                .collect();
            if rows.len() != matrix.nrows() {
                return Err(Error::DataError(format!(
                    "bundle '{}' fold {fold} has {} rows, the fold map assigns {}",
                    bundle.model,
                    matrix.nrows(),
                    rows.len()
                )));
            }

            for (r, &dest) in rows.iter().enumerate() {
                for c in 0..num_classes {
                    features[[dest, c * num_models + m]] = matrix[[r, c]];
                }
            }
        }
    }

    Ok(features)
}

/// Assemble the stacked test-set feature matrix from one bundle per
/// level-1 model, rows in dataset order
pub fn load_test_features(
    test_inputs: &[PathBuf],
    input_dir: &Path,
    threshold_dir: &Path,
    num_classes: usize,
) -> Result<Array2<f32>> {
    let num_models = test_inputs.len();
    let mut features: Option<Array2<f32>> = None;

    for (m, file) in test_inputs.iter().enumerate() {
        let path = input_dir.join(file);
        let (bundle, matrix) = load_recentered(&path, threshold_dir)?;

        if matrix.ncols() != num_classes {
            return Err(Error::DataError(format!(
                "bundle '{}' has {} classes, expected {num_classes}",
                bundle.model,
                matrix.ncols()
            )));
        }

        let out = features.get_or_insert_with(|| {
            Array2::zeros((matrix.nrows(), num_classes * num_models))
        });
        if out.nrows() != matrix.nrows() {
            return Err(Error::DataError(format!(
                "bundle '{}' has {} rows, other test bundles have {}",
                bundle.model,
                matrix.nrows(),
                out.nrows()
            )));
        }

        for r in 0..matrix.nrows() {
            for c in 0..num_classes {
                out[[r, c * num_models + m]] = matrix[[r, c]];
            }
        }
    }

    features.ok_or_else(|| Error::DataError("no test bundles configured".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;
    use tempfile::TempDir;

    #[test]
    fn test_bundle_round_trip() {
        let dir = TempDir::new().unwrap();
        let matrix = arr2(&[[0.1, 0.2], [0.3, 0.4]]);
        let bundle = PredictionFile::from_matrix("resnet", Some(0), &matrix);

        let path = dir.path().join("level1_train_resnet_f0.json");
        bundle.save(&path).unwrap();

        let loaded = PredictionFile::load(&path).unwrap();
        assert_eq!(loaded.model, "resnet");
        assert_eq!(loaded.fold, Some(0));
        assert_eq!(loaded.matrix().unwrap(), matrix);
    }

    #[test]
    fn test_bundle_shape_mismatch_rejected() {
        let bundle = PredictionFile {
            model: "bad".to_string(),
            fold: None,
            num_samples: 2,
            num_classes: 3,
            data: vec![0.0; 5],
        };
        assert!(bundle.matrix().is_err());
    }

    #[test]
    fn test_threshold_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resnet_f0.yml");
        save_threshold(&path, 0.125).unwrap();
        assert_abs_diff_eq!(load_threshold(&path).unwrap(), 0.125, epsilon = 1e-7);
    }

    #[test]
    fn test_threshold_path_strips_bundle_prefix() {
        let dir = Path::new("yml");
        let path = threshold_path(Path::new("level1_train_resnet_f0.json"), dir).unwrap();
        assert_eq!(path, Path::new("yml/resnet_f0.yml"));

        let path = threshold_path(Path::new("level1_test_resnet.json"), dir).unwrap();
        assert_eq!(path, Path::new("yml/resnet.yml"));

        assert!(threshold_path(Path::new("predictions.json"), dir).is_err());
    }

    #[test]
    fn test_oof_assembly_recenters_and_scatters() {
        let dir = TempDir::new().unwrap();
        let folds = vec![0u32, 1, 0, 1];

        // Two classes, one model, predictions stored centered at 0
        for fold in 0..2usize {
            let matrix = arr2(&[
                [0.0 + fold as f32 * 0.1, 0.2],
                [0.4, 0.6],
            ]);
            let bundle = PredictionFile::from_matrix("m", Some(fold), &matrix);
            bundle
                .save(&dir.path().join(format!("level1_train_m_f{fold}.json")))
                .unwrap();
            save_threshold(&dir.path().join(format!("m_f{fold}.yml")), 0.1).unwrap();
        }

        let inputs = vec![vec![
            PathBuf::from("level1_train_m_f0.json"),
            PathBuf::from("level1_train_m_f1.json"),
        ]];
        let features =
            load_oof_features(&inputs, dir.path(), dir.path(), &folds, 2).unwrap();

        assert_eq!(features.dim(), (4, 2));
        // Sample 0 is the first row of fold 0, recentered by +0.1
        assert_abs_diff_eq!(features[[0, 0]], 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(features[[0, 1]], 0.3, epsilon = 1e-6);
        // Sample 1 is the first row of fold 1
        assert_abs_diff_eq!(features[[1, 0]], 0.2, epsilon = 1e-6);
        // Sample 2 is the second row of fold 0
        assert_abs_diff_eq!(features[[2, 0]], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_oof_assembly_row_count_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let folds = vec![0u32, 0, 1];

        let matrix = arr2(&[[0.1, 0.2]]);
        PredictionFile::from_matrix("m", Some(0), &matrix)
            .save(&dir.path().join("level1_train_m_f0.json"))
            .unwrap();
        save_threshold(&dir.path().join("m_f0.yml"), 0.0).unwrap();
        PredictionFile::from_matrix("m", Some(1), &matrix)
            .save(&dir.path().join("level1_train_m_f1.json"))
            .unwrap();
        save_threshold(&dir.path().join("m_f1.yml"), 0.0).unwrap();

        let inputs = vec![vec![
            PathBuf::from("level1_train_m_f0.json"),
            PathBuf::from("level1_train_m_f1.json"),
        ]];
        // Fold 0 owns two samples but the bundle has one row
        assert!(load_oof_features(&inputs, dir.path(), dir.path(), &folds, 2).is_err());
    }

    #[test]
    fn test_test_assembly_interleaves_models() {
        let dir = TempDir::new().unwrap();

        for (m, value) in [("a", 0.2f32), ("b", 0.4)] {
            let matrix = arr2(&[[value, value], [value, value]]);
            PredictionFile::from_matrix(m, None, &matrix)
                .save(&dir.path().join(format!("level1_test_{m}.json")))
                .unwrap();
            save_threshold(&dir.path().join(format!("{m}.yml")), 0.0).unwrap();
        }

        let test_inputs =
            vec![PathBuf::from("level1_test_a.json"), PathBuf::from("level1_test_b.json")];
        let features = load_test_features(&test_inputs, dir.path(), dir.path(), 2).unwrap();

        assert_eq!(features.dim(), (2, 4));
        // Class-major: [c0 m0, c0 m1, c1 m0, c1 m1]
        assert_abs_diff_eq!(features[[0, 0]], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(features[[0, 1]], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(features[[0, 2]], 0.2, epsilon = 1e-6);
    }
}
