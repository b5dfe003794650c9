//! Experiment configuration: YAML schema, validation and loading

mod load;
mod schema;
mod validate;

pub use load::load_config;
pub use schema::{
    CosineConfig, DataConfig, LossConfig, LrFinderConfig, MixupConfig, ModelConfig,
    OptimizerConfig, StackSpec, TrainParams, WarmupConfig,
};
pub use validate::validate_config;
