//! Optimizers and learning rate scheduling

mod adam;
mod optimizer;
mod param_group;
mod scheduler;
mod sgd;

pub use adam::Adam;
pub use optimizer::Optimizer;
pub use param_group::ParamGroup;
pub use scheduler::{CosineRestarts, LinearWarmup, RestartOptions};
pub use sgd::Sgd;

use crate::config::OptimizerConfig;
use crate::{Error, Result};

/// Build an optimizer from its configuration, taking ownership of the
/// parameter groups
pub fn build_optimizer(cfg: &OptimizerConfig, groups: Vec<ParamGroup>) -> Result<Box<dyn Optimizer>> {
    match cfg.name.as_str() {
        "sgd" => Ok(Box::new(Sgd::new(groups, cfg.momentum))),
        "adam" => Ok(Box::new(Adam::default_params(groups))),
        other => Err(Error::ConfigError(format!("unknown optimizer '{other}'"))),
    }
}
