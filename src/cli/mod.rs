//! CLI definitions and command dispatch

mod commands;

pub use commands::run_command;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Apilar: level-2 stacking ensemble trainer
#[derive(Parser, Debug, Clone)]
#[command(name = "apilar")]
#[command(version)]
#[command(about = "Trains a stacking ensemble over level-1 predictions with cosine warm restarts")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train the ensemble from a YAML configuration
    Train(TrainArgs),

    /// Validate a configuration file without training
    Validate(ConfigArgs),

    /// Display information about a configuration
    Info(ConfigArgs),

    /// Run the learning rate range test and exit
    LrFinder(LrFinderArgs),

    /// Generate out-of-fold predictions for the held-out fold
    PredictOof(PredictArgs),

    /// Generate predictions for the test set
    PredictTest(PredictArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Held-out fold number
    #[arg(short, long, default_value_t = 0)]
    pub fold: usize,

    /// Checkpoint to resume training from
    #[arg(short, long)]
    pub weights: Option<PathBuf>,

    /// Override the cosine peak learning rate
    #[arg(long)]
    pub lr: Option<f32>,

    /// Override number of epochs
    #[arg(long)]
    pub num_epochs: Option<usize>,
}

/// Arguments for config-only commands
#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the lr-finder command
#[derive(Parser, Debug, Clone)]
pub struct LrFinderArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Held-out fold number
    #[arg(short, long, default_value_t = 0)]
    pub fold: usize,
}

/// Arguments for the predict commands
#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Trained checkpoint to predict with
    #[arg(short, long)]
    pub weights: PathBuf,

    /// Held-out fold number
    #[arg(short, long, default_value_t = 0)]
    pub fold: usize,
}
