//! Apilar: level-2 stacking ensemble trainer
//!
//! Combines per-model out-of-fold prediction arrays into a second-stage
//! ensemble for multi-label classification. The ensemble is a per-class
//! linear blend trained with a cosine annealing schedule with warm
//! restarts that drives both the learning rate and a normalized weight
//! decay.
//!
//! # Example
//!
//! ```no_run
//! use apilar::config::load_config;
//! use apilar::context::{LogLevel, RunContext};
//! use apilar::data::load_data;
//! use apilar::train::fit;
//!
//! let spec = load_config("config.yaml")?;
//! let ctx = RunContext::new(spec, 0, LogLevel::Normal);
//! let (train_set, val_set) = load_data(&ctx)?;
//! let outcome = fit(&ctx, &train_set, &val_set, None)?;
//! println!("best F2: {:.4}", outcome.best_score);
//! # Ok::<(), apilar::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod model;
pub mod optim;
pub mod tensor;
pub mod train;

pub use error::{Error, Result};
pub use tensor::Tensor;
