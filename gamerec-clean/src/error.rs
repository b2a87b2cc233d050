//! Error types for gamerec-clean
//!
//! Three layers:
//! - [`LookupError`]: a single external call failed (always recovered by the cascade)
//! - [`CompletionError`]: the per-record failure taxonomy
//! - [`TrainingError`]: model fitting and persistence

use crate::types::PlayerTarget;
use thiserror::Error;

/// Failure of one external lookup
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    /// Transport failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status other than 404/429
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// Provider answered 429 and retries were exhausted
    #[error("Rate limited by {0}")]
    RateLimited(String),

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider has no page for this record
    #[error("Not found: {0}")]
    NotFound(String),
}

impl LookupError {
    /// Worth retrying after a fixed delay
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::Network(_))
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            LookupError::Http {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            LookupError::Parse(err.to_string())
        } else {
            LookupError::Network(err.to_string())
        }
    }
}

/// Per-record failure taxonomy
///
/// Only `InsufficientSignal` and `UnexpectedRecord` end a record; the rest
/// are recovered inside the cascade or the estimator.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// External source could not supply data; field stays unsupplied
    #[error("Lookup failure: {0}")]
    LookupFailure(#[from] LookupError),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// No trained model for a target; heuristic takes over
    #[error("No model available for {0}")]
    ModelUnavailable(PlayerTarget),

    /// All three player-count fields missing after external completion
    #[error("Insufficient signal: all player-count fields missing")]
    InsufficientSignal,

    /// Any other failure while processing one record
    #[error("Unexpected record error: {0}")]
    UnexpectedRecord(String),
}

/// Model fitting and persistence errors
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Not enough samples for {target}: {count} (need at least {required})")]
    InsufficientSamples {
        target: PlayerTarget,
        count: usize,
        required: usize,
    },

    /// Design matrix and targets disagree, or features are missing
    #[error("Shape error: {0}")]
    Shape(String),

    /// Model expects a feature the vector does not carry
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TrainingResult<T> = Result<T, TrainingError>;
