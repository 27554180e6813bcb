//! Error types shared by the indicator, signal, evaluation and search stages.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Insufficient data: required {required} bars, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("Empty series: at least 2 bars are needed to evaluate, got {got}")]
    EmptySeries { got: usize },

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid iterations: {0} (must be >= 1)")]
    InvalidIterations(usize),

    #[error("Length mismatch: {what} has {got} values, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid bars: {0}")]
    InvalidBars(String),
}

pub type Result<T> = std::result::Result<T, StrategyError>;
