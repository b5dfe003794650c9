//! Configuration loading

use super::schema::StackSpec;
use super::validate::validate_config;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Load and validate an experiment specification from a YAML file
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<StackSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec: StackSpec = serde_yaml::from_str(&yaml_content)
        .map_err(|e| Error::ConfigError(format!("failed to parse YAML config: {e}")))?;

    validate_config(&spec)?;

    Ok(spec)
}
