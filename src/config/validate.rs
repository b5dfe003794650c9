//! Structural validation of loaded configurations

use super::schema::StackSpec;
use crate::{Error, Result};

/// Validate a specification before any training work begins.
///
/// Every violation is a caller configuration bug and fails fast.
pub fn validate_config(spec: &StackSpec) -> Result<()> {
    if spec.model.num_classes == 0 {
        return Err(Error::ConfigError("model.num_classes must be positive".to_string()));
    }
    if spec.model.num_folds == 0 {
        return Err(Error::ConfigError("model.num_folds must be positive".to_string()));
    }

    if spec.data.inputs.is_empty() {
        return Err(Error::ConfigError("data.inputs must name at least one level-1 model".to_string()));
    }
    for (i, files) in spec.data.inputs.iter().enumerate() {
        if files.len() != spec.model.num_folds {
            return Err(Error::ConfigError(format!(
                "data.inputs[{i}] has {} files, expected one per fold ({})",
                files.len(),
                spec.model.num_folds
            )));
        }
    }
    if let Some(test_inputs) = &spec.data.test_inputs {
        if test_inputs.len() != spec.data.inputs.len() {
            return Err(Error::ConfigError(format!(
                "data.test_inputs has {} files, expected one per level-1 model ({})",
                test_inputs.len(),
                spec.data.inputs.len()
            )));
        }
    }

    if spec.train.batch_size == 0 {
        return Err(Error::ConfigError("train.batch_size must be positive".to_string()));
    }
    if spec.train.num_epochs == 0 {
        return Err(Error::ConfigError("train.num_epochs must be positive".to_string()));
    }
    if spec.train.accum_batches_num == 0 {
        return Err(Error::ConfigError("train.accum_batches_num must be positive".to_string()));
    }
    if spec.train.log_freq == 0 {
        return Err(Error::ConfigError("train.log_freq must be positive".to_string()));
    }
    if spec.train.mixup.enable && spec.train.mixup.beta_a <= 0.0 {
        return Err(Error::ConfigError("train.mixup.beta_a must be positive".to_string()));
    }

    match spec.optimizer.name.as_str() {
        "sgd" | "adam" => {}
        other => {
            return Err(Error::ConfigError(format!("unknown optimizer '{other}'")));
        }
    }
    if spec.optimizer.lr <= 0.0 {
        return Err(Error::ConfigError("optimizer.lr must be positive".to_string()));
    }

    match spec.loss.name.as_str() {
        "bce" | "mse" => {}
        other => {
            return Err(Error::ConfigError(format!("unknown loss '{other}'")));
        }
    }

    let cosine = &spec.cosine;
    if cosine.start_lr <= 0.0 {
        return Err(Error::ConfigError("cosine.start_lr must be positive".to_string()));
    }
    if cosine.period <= 0.0 {
        return Err(Error::ConfigError("cosine.period must be positive".to_string()));
    }
    if cosine.period_inc < 0.0 {
        return Err(Error::ConfigError("cosine.period_inc must be non-negative".to_string()));
    }
    if cosine.max_period < cosine.period {
        return Err(Error::ConfigError("cosine.max_period must be >= cosine.period".to_string()));
    }
    if cosine.min_lr <= 0.0 {
        return Err(Error::ConfigError("cosine.min_lr must be positive".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DataConfig, ModelConfig, StackSpec};
    use std::path::PathBuf;

    fn valid_spec() -> StackSpec {
        StackSpec {
            version: "test".to_string(),
            experiment_dir: PathBuf::from("exp"),
            model: ModelConfig { num_classes: 4, num_folds: 2 },
            data: DataConfig {
                input_dir: PathBuf::new(),
                inputs: vec![vec![PathBuf::from("a_f0.json"), PathBuf::from("a_f1.json")]],
                test_inputs: None,
                folds_file: PathBuf::from("folds.json"),
                labels_file: PathBuf::from("train.csv"),
                threshold_dir: PathBuf::new(),
            },
            train: Default::default(),
            optimizer: Default::default(),
            loss: Default::default(),
            cosine: Default::default(),
        }
    }

    #[test]
    fn test_valid_spec_passes() {
        assert!(validate_config(&valid_spec()).is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut spec = valid_spec();
        spec.train.batch_size = 0;
        assert!(validate_config(&spec).is_err());
    }

    #[test]
    fn test_fold_count_mismatch_rejected() {
        let mut spec = valid_spec();
        spec.data.inputs = vec![vec![PathBuf::from("a_f0.json")]];
        let err = validate_config(&spec).unwrap_err();
        assert!(err.to_string().contains("one per fold"));
    }

    #[test]
    fn test_unknown_optimizer_rejected() {
        let mut spec = valid_spec();
        spec.optimizer.name = "rmsprop".to_string();
        assert!(validate_config(&spec).is_err());
    }

    #[test]
    fn test_unknown_loss_rejected() {
        let mut spec = valid_spec();
        spec.loss.name = "hinge".to_string();
        assert!(validate_config(&spec).is_err());
    }

    #[test]
    fn test_max_period_below_period_rejected() {
        let mut spec = valid_spec();
        spec.cosine.period = 10.0;
        spec.cosine.max_period = 5.0;
        assert!(validate_config(&spec).is_err());
    }

    #[test]
    fn test_mixup_beta_checked_only_when_enabled() {
        let mut spec = valid_spec();
        spec.train.mixup.beta_a = 0.0;
        assert!(validate_config(&spec).is_ok());

        spec.train.mixup.enable = true;
        assert!(validate_config(&spec).is_err());
    }

    #[test]
    fn test_test_inputs_count_mismatch_rejected() {
        let mut spec = valid_spec();
        spec.data.test_inputs = Some(vec![]);
        assert!(validate_config(&spec).is_err());
    }
}
