//! Run context
//!
//! Configuration, fold selection and verbosity travel together as an
//! explicit context handed to every pipeline function instead of
//! living in globals. The scheduler core never sees this type, it
//! takes plain scalars.

use crate::config::StackSpec;

/// Verbosity of CLI and training-loop output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Suppress all output
    Quiet,
    /// Normal output level
    Normal,
    /// Verbose output with additional details
    Verbose,
}

/// Per-run state shared by the pipeline functions
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Loaded and validated experiment specification
    pub spec: StackSpec,

    /// Validation fold held out for this run
    pub fold: usize,

    /// Output verbosity
    pub log: LogLevel,
}

impl RunContext {
    /// Create a context for one fold of an experiment
    pub fn new(spec: StackSpec, fold: usize, log: LogLevel) -> Self {
        Self { spec, fold, log }
    }

    /// Print a normal-level message
    pub fn info(&self, msg: &str) {
        if self.log != LogLevel::Quiet {
            println!("{msg}");
        }
    }

    /// Print a verbose-level message
    pub fn debug(&self, msg: &str) {
        if self.log == LogLevel::Verbose {
            println!("{msg}");
        }
    }
}
