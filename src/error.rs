//! Error types for throughput analysis

use thiserror::Error;

/// Errors that can occur while analysing a sequence of trials
#[derive(Debug, Error)]
pub enum ThroughputError {
    #[error("Insufficient data: {trials} trial(s), at least 2 are required")]
    InsufficientData { trials: usize },

    #[error("Malformed trial at index {index}: {reason}")]
    MalformedTrial { index: usize, reason: String },

    #[error("Degenerate sequence: {0}")]
    DegenerateSequence(String),

    #[error("Invalid nominal condition: {0}")]
    InvalidCondition(String),

    #[error("Column length mismatch: from={from}, to={to}, select={select}, movement_time={movement_time}")]
    LengthMismatch {
        from: usize,
        to: usize,
        select: usize,
        movement_time: usize,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ThroughputError {
    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        ThroughputError::MalformedTrial {
            index,
            reason: reason.into(),
        }
    }
}
