//! Error types.
//!
//! Making a prediction and updating the predictor cannot fail: every index
//! is masked into range and every counter saturates. Errors only come from
//! building a predictor out of a bad configuration, or from reading traces.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating a [`crate::PredictorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A tagged table asks for more history than the register holds.
    #[error("history length {len} for tagged table {table} exceeds the {max}-bit global history register")]
    HistoryTooLong { table: usize, len: usize, max: usize },

    /// A tagged table was configured without any history.
    #[error("tagged table {table} has a zero-length history")]
    EmptyHistory { table: usize },

    /// Tagged tables must be ordered from shortest to longest history.
    #[error("history lengths must be strictly increasing (table {table}: {prev} >= {len})")]
    HistoryNotIncreasing { table: usize, prev: usize, len: usize },

    /// A usefulness reset period of zero would never fire.
    #[error("usefulness reset periods must be non-zero")]
    ZeroResetPeriod,

    /// The low-bit reset must happen before the high-bit reset.
    #[error("low-bit reset period {low} must be shorter than high-bit reset period {high}")]
    ResetPeriodOrder { low: u32, high: u32 },

    /// The configuration could not be deserialized.
    #[error("malformed predictor configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
}

/// Errors raised while reading a branch trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },

    /// A record could not be parsed.
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
