//! Common error types for gamerec

use thiserror::Error;

/// Common result type for gamerec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the cleaner and the trainer
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
