//! Apilar CLI
//!
//! Stacking-ensemble training entry point.
//!
//! # Usage
//!
//! ```bash
//! # Train fold 0 from config
//! apilar train config.yaml --fold 0
//!
//! # Resume from a checkpoint
//! apilar train config.yaml --fold 0 --weights exp/v1_f0_e07_0.5912.json
//!
//! # Validate or inspect a config
//! apilar validate config.yaml
//! apilar info config.yaml
//!
//! # Find a learning rate range
//! apilar lr-finder config.yaml
//!
//! # Generate next-level predictions
//! apilar predict-oof config.yaml --weights exp/v1_f0_e07_0.5912.json
//! apilar predict-test config.yaml --weights exp/v1_f0_e07_0.5912.json
//! ```

use apilar::cli::{run_command, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
