//! Pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur anywhere in the streaming pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot open table at {path:?}: {reason}")]
    Connection { path: PathBuf, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed record: {0}")]
    Data(String),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
