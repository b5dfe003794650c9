//! Error types for the apilar crate

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Scheduler or optimizer construction failed
    #[error("initialization error: {0}")]
    InitError(String),

    /// `step()` was called more times than there are mini-batches in the
    /// current epoch. The caller must call `epoch_step()` at the top of
    /// every epoch before stepping.
    #[error("batch increment sequence exhausted; call epoch_step() before step()")]
    BatchIncrementExhausted,

    /// Invalid or unreadable configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Malformed or inconsistent input data
    #[error("data error: {0}")]
    DataError(String),

    /// Serialization or deserialization failure
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ConfigError("batch_size must be positive".to_string());
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_exhaustion_message_names_protocol() {
        let err = Error::BatchIncrementExhausted;
        assert!(err.to_string().contains("epoch_step"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
